//! Shift-JIS dialect tables and strict decode/encode helpers.
//!
//! Each dialect carries its own explicit byte table. The tables differ in
//! small ways (X0213 drops the `0x85..=0x86` lead rows and accepts a space
//! trail, CP932 opens the `0xF0..=0xFC` user rows and single-byte
//! continuation), so none of them is derived from another.
//!
//! Decoding goes through the WHATWG Shift_JIS codec, which carries the CP932
//! vendor rows. Under the other dialects those rows mean something else, so
//! units led by them are refused instead of decoded to the CP932 glyph.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use encoding_rs::SHIFT_JIS;
use serde::{Deserialize, Serialize};

/// Shift-JIS family member used for classification and decoding.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Dialect
{
    /// JIS X 0208 Shift-JIS
    #[default]
    #[value(name = "shift-jis")]
    ShiftJis,

    /// Shift_JIS-2004 (JIS X 0213). Only the JIS X 0208 subset decodes.
    #[value(name = "shift-jis-x0213")]
    ShiftJisX0213,

    /// Microsoft code page 932
    #[value(name = "cp932")]
    Cp932,
}

/// Byte ranges accepted by one dialect.
#[derive(Debug)]
pub struct DialectTable
{
    pub lead: &'static [RangeInclusive<u8>],
    pub trail: &'static [RangeInclusive<u8>],
    /// Bytes that may extend a run that already holds a double-byte unit.
    pub single: &'static [RangeInclusive<u8>],
    /// Lead bytes the codec would read as CP932 vendor extensions.
    pub vendor_leads: &'static [RangeInclusive<u8>],
}

static SHIFT_JIS_TABLE: DialectTable = DialectTable {
    lead: &[0x81..=0x9F, 0xE0..=0xEF],
    trail: &[0x40..=0x7E, 0x80..=0xFC],
    single: &[],
    vendor_leads: &[0x87..=0x87, 0xED..=0xEE, 0xFA..=0xFC],
};

static SHIFT_JIS_X0213_TABLE: DialectTable = DialectTable {
    lead: &[0x81..=0x84, 0x87..=0x9F, 0xE0..=0xEF, 0xFA..=0xFC],
    trail: &[0x20..=0x20, 0x40..=0x7E, 0x80..=0xFC],
    single: &[],
    // Plane 1 rows 89-94 and plane 2 in Shift_JIS-2004
    vendor_leads: &[0xED..=0xEE, 0xFA..=0xFC],
};

static CP932_TABLE: DialectTable = DialectTable {
    lead: &[0x81..=0x9F, 0xE0..=0xFC],
    trail: &[0x40..=0x7E, 0x80..=0xFC],
    single: &[0xA1..=0xDF],
    vendor_leads: &[],
};

#[inline]
fn in_ranges(
    ranges: &[RangeInclusive<u8>],
    b: u8,
) -> bool
{
    ranges
        .iter()
        .any(|r| r.contains(&b))
}

/// Printable ASCII or newline.
#[inline]
pub fn is_valid_ascii_continuation(b: u8) -> bool
{
    b == 0x0A || (0x20..=0x7E).contains(&b)
}

/// Errors raised by the strict codec helpers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError
{
    #[error("byte sequence is not valid {dialect}")]
    Decode
    {
        dialect: Dialect
    },

    #[error("text contains characters not representable in {dialect}")]
    Unencodable
    {
        dialect: Dialect
    },
}

impl Dialect
{
    pub const ALL: [Dialect; 3] = [Dialect::ShiftJis, Dialect::ShiftJisX0213, Dialect::Cp932];

    pub fn table(self) -> &'static DialectTable
    {
        match self
        {
            Dialect::ShiftJis => &SHIFT_JIS_TABLE,
            Dialect::ShiftJisX0213 => &SHIFT_JIS_X0213_TABLE,
            Dialect::Cp932 => &CP932_TABLE,
        }
    }

    #[inline]
    pub fn is_valid_lead_byte(
        self,
        b: u8,
    ) -> bool
    {
        in_ranges(self.table().lead, b)
    }

    #[inline]
    pub fn is_valid_trail_byte(
        self,
        b: u8,
    ) -> bool
    {
        in_ranges(self.table().trail, b)
    }

    /// True when `b` may extend a run as a one-byte unit under this dialect.
    /// Only CP932 has one-byte units: ASCII continuations and half-width kana.
    #[inline]
    pub fn is_valid_single_byte(
        self,
        b: u8,
    ) -> bool
    {
        match self
        {
            Dialect::Cp932 => is_valid_ascii_continuation(b) || in_ranges(self.table().single, b),
            Dialect::ShiftJis | Dialect::ShiftJisX0213 => in_ranges(self.table().single, b),
        }
    }

    /// First lead byte in `bytes` that this dialect cannot decode faithfully.
    fn vendor_lead(
        self,
        bytes: &[u8],
    ) -> Option<u8>
    {
        let vendor = self.table().vendor_leads;
        if vendor.is_empty()
        {
            return None;
        }

        let mut i = 0;
        while i < bytes.len()
        {
            let b = bytes[i];
            if matches!(b, 0x81..=0x9F | 0xE0..=0xFC)
            {
                if in_ranges(vendor, b)
                {
                    return Some(b);
                }
                i += 2;
            }
            else
            {
                i += 1;
            }
        }
        None
    }

    /// True when `b` can take part in no unit at all: not a lead, not a
    /// trail, not a continuation. The scanner is always Idle at such a byte.
    #[inline]
    pub fn is_separator(
        self,
        b: u8,
    ) -> bool
    {
        !self.is_valid_lead_byte(b) && !self.is_valid_trail_byte(b) && !self.is_valid_single_byte(b)
    }

    /// Decode without replacement characters. Units led by a vendor row the
    /// dialect does not share with CP932 are a decode error.
    pub fn decode(
        self,
        bytes: &[u8],
    ) -> Result<String, CodecError>
    {
        if self
            .vendor_lead(bytes)
            .is_some()
        {
            return Err(CodecError::Decode { dialect: self });
        }

        SHIFT_JIS
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(|text| text.into_owned())
            .ok_or(CodecError::Decode { dialect: self })
    }

    /// Encode, failing on any unmappable character or on a character that
    /// only a CP932 vendor row can hold.
    pub fn encode(
        self,
        text: &str,
    ) -> Result<Vec<u8>, CodecError>
    {
        let (encoded, _, had_errors) = SHIFT_JIS.encode(text);
        if had_errors
            || self
                .vendor_lead(&encoded)
                .is_some()
        {
            return Err(CodecError::Unencodable { dialect: self });
        }

        Ok(encoded.into_owned())
    }
}

impl fmt::Display for Dialect
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result
    {
        match self
        {
            Dialect::ShiftJis => write!(f, "shift-jis"),
            Dialect::ShiftJisX0213 => write!(f, "shift-jis-x0213"),
            Dialect::Cp932 => write!(f, "cp932"),
        }
    }
}

impl FromStr for Dialect
{
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s
            .to_ascii_lowercase()
            .replace('_', "-")
            .as_str()
        {
            "shift-jis" | "sjis" => Ok(Dialect::ShiftJis),
            "shift-jis-x0213" | "shift-jisx0213" | "sjis-2004" => Ok(Dialect::ShiftJisX0213),
            "cp932" | "windows-31j" | "ms932" => Ok(Dialect::Cp932),
            other => anyhow::bail!("unknown dialect: {other}"),
        }
    }
}
