//! Property, tag and class declarations of a style rule

use crate::DataSet;
use crate::tag::TagKey;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Rendering property set by a [`Declaration`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Property {
    // general
    ZIndex,

    // line
    Width,
    Color,
    Opacity,
    Dashes,
    Image,
    LineCap,
    LineJoin,

    // line casing
    CasingWidth,
    CasingColor,
    CasingOpacity,
    CasingDashes,
    CasingLineCap,
    CasingLineJoin,

    // 3D
    Extrude,

    // polygon and canvas
    FillColor,
    FillOpacity,
    FillImage,

    // icon
    IconImage,
    IconWidth,
    IconHeight,
    IconOpacity,
    IconColor,
    IconAllowTextOverlap,
    IconAllowIconOverlap,

    // label
    FontFamily,
    FontSize,
    FontWeight,
    FontStyle,
    FontVariant,
    TextDecoration,
    TextTransform,
    TextColor,
    TextOpacity,
    TextPosition,
    TextOffset,
    MaxWidth,
    Text,
    TextHaloColor,
    TextHaloRadius,

    // shield (casing > frame > shield > text)
    ShieldColor,
    ShieldOpacity,
    ShieldFrameColor,
    ShieldFrameWidth,
    ShieldCasingColor,
    ShieldCasingWidth,
    ShieldText,
    ShieldImage,
    ShieldShape,
}

/// Stylesheet name of each property
const PROPERTY_NAMES: &[(&str, Property)] = &[
    ("z-index", Property::ZIndex),
    ("width", Property::Width),
    ("color", Property::Color),
    ("opacity", Property::Opacity),
    ("dashes", Property::Dashes),
    ("image", Property::Image),
    ("linecap", Property::LineCap),
    ("linejoin", Property::LineJoin),
    ("casing-width", Property::CasingWidth),
    ("casing-color", Property::CasingColor),
    ("casing-opacity", Property::CasingOpacity),
    ("casing-dashes", Property::CasingDashes),
    ("casing-linecap", Property::CasingLineCap),
    ("casing-linejoin", Property::CasingLineJoin),
    ("extrude", Property::Extrude),
    ("fill-color", Property::FillColor),
    ("fill-opacity", Property::FillOpacity),
    ("fill-image", Property::FillImage),
    ("icon-image", Property::IconImage),
    ("icon-width", Property::IconWidth),
    ("icon-height", Property::IconHeight),
    ("icon-opacity", Property::IconOpacity),
    ("icon-color", Property::IconColor),
    ("icon-allow-text-overlap", Property::IconAllowTextOverlap),
    ("icon-allow-icon-overlap", Property::IconAllowIconOverlap),
    ("font-family", Property::FontFamily),
    ("font-size", Property::FontSize),
    ("font-weight", Property::FontWeight),
    ("font-style", Property::FontStyle),
    ("font-variant", Property::FontVariant),
    ("text-decoration", Property::TextDecoration),
    ("text-transform", Property::TextTransform),
    ("text-color", Property::TextColor),
    ("text-opacity", Property::TextOpacity),
    ("text-position", Property::TextPosition),
    ("text-offset", Property::TextOffset),
    ("max-width", Property::MaxWidth),
    ("text", Property::Text),
    ("text-halo-color", Property::TextHaloColor),
    ("text-halo-radius", Property::TextHaloRadius),
    ("shield-color", Property::ShieldColor),
    ("shield-opacity", Property::ShieldOpacity),
    ("shield-frame-color", Property::ShieldFrameColor),
    ("shield-frame-width", Property::ShieldFrameWidth),
    ("shield-casing-color", Property::ShieldCasingColor),
    ("shield-casing-width", Property::ShieldCasingWidth),
    ("shield-text", Property::ShieldText),
    ("shield-image", Property::ShieldImage),
    ("shield-shape", Property::ShieldShape),
];

impl Property {
    /// Look up a property by its stylesheet name
    pub fn from_name(name: &str) -> Option<Property> {
        PROPERTY_NAMES
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, property)| *property)
    }

    pub fn name(&self) -> &'static str {
        PROPERTY_NAMES
            .iter()
            .find(|(_, property)| property == self)
            .map(|(name, _)| *name)
            .unwrap_or_default()
    }

    /// Kind of geometry a consumer has to produce for this property
    pub fn flags(&self) -> PropertyFlags {
        use Property as P;
        match self {
            P::ZIndex => PropertyFlags::NONE,
            P::Width
            | P::Color
            | P::Opacity
            | P::Dashes
            | P::Image
            | P::LineCap
            | P::LineJoin
            | P::CasingWidth
            | P::CasingColor
            | P::CasingOpacity
            | P::CasingDashes
            | P::CasingLineCap
            | P::CasingLineJoin => PropertyFlags::LINE,
            P::Extrude => PropertyFlags::EXTRUDE,
            P::FillColor | P::FillOpacity | P::FillImage => {
                PropertyFlags::AREA | PropertyFlags::CANVAS
            }
            P::IconImage
            | P::IconWidth
            | P::IconHeight
            | P::IconOpacity
            | P::IconColor
            | P::IconAllowTextOverlap
            | P::IconAllowIconOverlap
            | P::FontFamily
            | P::FontSize
            | P::FontWeight
            | P::FontStyle
            | P::FontVariant
            | P::TextDecoration
            | P::TextTransform
            | P::TextColor
            | P::TextOpacity
            | P::TextPosition
            | P::TextOffset
            | P::MaxWidth
            | P::Text
            | P::TextHaloColor
            | P::TextHaloRadius
            | P::ShieldColor
            | P::ShieldOpacity
            | P::ShieldFrameColor
            | P::ShieldFrameWidth
            | P::ShieldCasingColor
            | P::ShieldCasingWidth
            | P::ShieldText
            | P::ShieldImage
            | P::ShieldShape => PropertyFlags::LABEL,
        }
    }
}

/// Geometry requirement bits of a declaration, OR'd together in results
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PropertyFlags(u8);

impl PropertyFlags {
    pub const NONE: PropertyFlags = PropertyFlags(0);
    pub const AREA: PropertyFlags = PropertyFlags(1);
    pub const LINE: PropertyFlags = PropertyFlags(2);
    pub const LABEL: PropertyFlags = PropertyFlags(4);
    pub const CANVAS: PropertyFlags = PropertyFlags(8);
    pub const EXTRUDE: PropertyFlags = PropertyFlags(16);

    #[inline]
    pub fn contains(&self, other: PropertyFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn intersects(&self, other: PropertyFlags) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn bits(&self) -> u8 {
        self.0
    }
}

impl BitOr for PropertyFlags {
    type Output = PropertyFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        PropertyFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for PropertyFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// What a declaration does when its rule matches
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeclarationType {
    /// Sets a rendering property
    Property,
    /// Sets a tag value visible to later rules of the same evaluation
    Tag,
    /// Assigns a class visible to later rules of the same evaluation
    Class,
}

/// Unit of a numeric value; conversion is up to the renderer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Unit {
    #[default]
    None,
    Pixels,
    Points,
    Meters,
}

impl Unit {
    pub fn from_name(name: &str) -> Option<Unit> {
        match name {
            "" => Some(Unit::None),
            "px" => Some(Unit::Pixels),
            "pt" => Some(Unit::Points),
            "m" => Some(Unit::Meters),
            _ => None,
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            Unit::None => "",
            Unit::Pixels => "px",
            Unit::Points => "pt",
            Unit::Meters => "m",
        }
    }
}

/// RGBA color with 8 bits per channel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// From a packed `0xAARRGGBB` value
    pub const fn from_argb(argb: u32) -> Self {
        Self {
            a: (argb >> 24) as u8,
            r: (argb >> 16) as u8,
            g: (argb >> 8) as u8,
            b: argb as u8,
        }
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        if !digits.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16).ok();
        match digits.len() {
            3 => {
                let short = |i: usize| channel(i..i + 1).map(|v| v * 17);
                Some(Self::rgb(short(0)?, short(1)?, short(2)?))
            }
            6 => Some(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
            8 => Some(Self::rgba(
                channel(0..2)?,
                channel(2..4)?,
                channel(4..6)?,
                channel(6..8)?,
            )),
            _ => None,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

/// Payload of a declaration
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    None,
    Int(i32),
    Double(f64),
    Bool(bool),
    /// Quoted string
    String(String),
    Color(Color),
    /// Name of a tag whose value is used, e.g. `text: name`
    Key(String),
    Dashes(Vec<f64>),
    /// Bare keyword such as `round` or `bold`
    Identifier(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => Ok(()),
            Value::Int(value) => write!(f, "{value}"),
            Value::Double(value) => write!(f, "{value}"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::String(value) => write!(f, "{value:?}"),
            Value::Color(color) => write!(f, "{color}"),
            Value::Key(name) | Value::Identifier(name) => f.write_str(name),
            Value::Dashes(dashes) => {
                for (i, dash) in dashes.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{dash}")?;
                }
                Ok(())
            }
        }
    }
}

/// Line end cap style
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LineCap {
    #[default]
    Flat,
    Round,
    Square,
}

/// Line join style
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LineJoin {
    #[default]
    Round,
    Miter,
    Bevel,
}

/// Label placement
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextPosition {
    #[default]
    None,
    Line,
    Center,
}

/// Label text transformation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Capitalization {
    #[default]
    Mixed,
    AllUppercase,
    AllLowercase,
    Capitalize,
}

/// One `name: value;` entry of a rule
///
/// Unknown property names produce an invalid declaration that carries no flags
/// and is skipped during evaluation.
#[derive(Clone, Debug, PartialEq)]
pub struct Declaration {
    declaration_type: DeclarationType,
    /// Property, tag or class name as written
    name: String,
    property: Option<Property>,
    flags: PropertyFlags,
    value: Value,
    unit: Unit,
    key: Option<TagKey>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Declaration {
    /// Property declaration, inert if `name` is not a known property
    pub fn property(name: impl Into<String>, value: Value) -> Self {
        let name = name.into();
        let property = Property::from_name(&name);
        if property.is_none() {
            tracing::trace!(name = %name, "Unknown style property, declaration is inert");
        }
        Self {
            declaration_type: DeclarationType::Property,
            flags: property.map(|p| p.flags()).unwrap_or_default(),
            name,
            property,
            value,
            unit: Unit::None,
            key: None,
        }
    }

    /// `set name = value;`
    pub fn tag(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            declaration_type: DeclarationType::Tag,
            name: name.into(),
            property: None,
            flags: PropertyFlags::NONE,
            value: Value::String(value.into()),
            unit: Unit::None,
            key: None,
        }
    }

    /// `set .name;`
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            declaration_type: DeclarationType::Class,
            name: name.into(),
            property: None,
            flags: PropertyFlags::NONE,
            value: Value::None,
            unit: Unit::None,
            key: None,
        }
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    /// Whether this declaration has any effect
    pub fn is_valid(&self) -> bool {
        match self.declaration_type {
            DeclarationType::Property => self.property.is_some(),
            DeclarationType::Tag | DeclarationType::Class => !self.name.is_empty(),
        }
    }

    /// Resolve tag names in the payload (and the tag set by a tag declaration)
    pub fn compile(&mut self, dataset: &DataSet) {
        self.key = match (&self.declaration_type, &self.value) {
            (DeclarationType::Tag, _) => dataset.tag_key(&self.name),
            (_, Value::Key(name)) => dataset.tag_key(name),
            _ => None,
        };
    }

    pub fn declaration_type(&self) -> DeclarationType {
        self.declaration_type
    }

    /// Resolved property, `None` for tag, class and unknown declarations
    pub fn property_kind(&self) -> Option<Property> {
        self.property
    }

    pub fn property_flags(&self) -> PropertyFlags {
        self.flags
    }

    /// Property, tag or class name as written in the stylesheet
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn int_value(&self) -> Option<i32> {
        match self.value {
            Value::Int(value) => Some(value),
            Value::Double(value) => Some(value.round() as i32),
            _ => None,
        }
    }

    pub fn double_value(&self) -> Option<f64> {
        match self.value {
            Value::Int(value) => Some(value as f64),
            Value::Double(value) => Some(value),
            _ => None,
        }
    }

    pub fn bool_value(&self) -> Option<bool> {
        match self.value {
            Value::Bool(value) => Some(value),
            _ => None,
        }
    }

    pub fn string_value(&self) -> Option<&str> {
        match &self.value {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn color_value(&self) -> Option<Color> {
        match self.value {
            Value::Color(color) => Some(color),
            _ => None,
        }
    }

    /// Tag name of a key payload
    pub fn key_name(&self) -> Option<&str> {
        match &self.value {
            Value::Key(name) => Some(name),
            _ => None,
        }
    }

    /// Resolved key of a key payload, or of the tag set by a tag declaration
    pub fn tag_key(&self) -> Option<TagKey> {
        self.key
    }

    pub fn dashes_value(&self) -> Option<&[f64]> {
        match &self.value {
            Value::Dashes(dashes) => Some(dashes),
            _ => None,
        }
    }

    pub fn identifier(&self) -> Option<&str> {
        match &self.value {
            Value::Identifier(ident) => Some(ident),
            _ => None,
        }
    }

    pub fn line_cap(&self) -> LineCap {
        match self.identifier() {
            Some("round") => LineCap::Round,
            Some("square") => LineCap::Square,
            _ => LineCap::Flat,
        }
    }

    pub fn line_join(&self) -> LineJoin {
        match self.identifier() {
            Some("miter") => LineJoin::Miter,
            Some("bevel") => LineJoin::Bevel,
            _ => LineJoin::Round,
        }
    }

    pub fn text_position(&self) -> TextPosition {
        match self.identifier() {
            Some("line") => TextPosition::Line,
            Some("center") => TextPosition::Center,
            _ => TextPosition::None,
        }
    }

    pub fn capitalization(&self) -> Capitalization {
        match self.identifier() {
            Some("uppercase") => Capitalization::AllUppercase,
            Some("lowercase") => Capitalization::AllLowercase,
            Some("capitalize") => Capitalization::Capitalize,
            _ => Capitalization::Mixed,
        }
    }

    /// `bold`, or a numeric weight of at least 600
    pub fn is_bold(&self) -> bool {
        match self.identifier() {
            Some(ident) => ident == "bold",
            None => self.double_value().is_some_and(|weight| weight >= 600.0),
        }
    }

    pub fn is_italic(&self) -> bool {
        self.identifier() == Some("italic")
    }

    pub fn is_underline(&self) -> bool {
        self.identifier() == Some("underline")
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.declaration_type {
            DeclarationType::Property => {
                write!(f, "{}: {}{};", self.name, self.value, self.unit.suffix())
            }
            DeclarationType::Tag => write!(f, "set {} = {};", self.name, self.value),
            DeclarationType::Class => write!(f, "set .{};", self.name),
        }
    }
}
