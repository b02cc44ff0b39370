//! Minimal BER tag-length-value reader
//!
//! Supports what the artifact schemas need: single and multi-byte tags, short
//! and long definite lengths, indefinite lengths on constructed values, and
//! INTEGER/ENUMERATED, VisibleString and OCTET STRING primitives. Every error
//! carries the absolute byte offset it was detected at.

use crate::error::DecodeError;

pub(crate) type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// Longest definite length accepted (in length octets)
const MAX_LENGTH_OCTETS: usize = 4;
/// Nesting limit for indefinite-length scanning
const MAX_DEPTH: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Class {
    Universal,
    Application,
    Context,
    Private,
}

/// Class and number of a tag, ignoring the constructed bit
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct TagId {
    pub class: Class,
    pub number: u32,
}

impl TagId {
    pub const SEQUENCE: TagId = TagId::universal(16);

    pub const fn universal(number: u32) -> Self {
        Self {
            class: Class::Universal,
            number,
        }
    }

    pub const fn context(number: u32) -> Self {
        Self {
            class: Class::Context,
            number,
        }
    }
}

impl std::fmt::Display for TagId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.class {
            Class::Universal => write!(f, "[UNIVERSAL {}]", self.number),
            Class::Application => write!(f, "[APPLICATION {}]", self.number),
            Class::Context => write!(f, "[{}]", self.number),
            Class::Private => write!(f, "[PRIVATE {}]", self.number),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Tag {
    pub id: TagId,
    pub constructed: bool,
}

/// One decoded element
#[derive(Clone, Copy, Debug)]
pub(crate) struct Tlv<'a> {
    pub tag: Tag,
    /// Absolute offset of the identifier octet
    pub offset: usize,
    /// Absolute offset of the first content octet
    pub content_offset: usize,
    pub content: &'a [u8],
}

/// Cursor over a run of consecutive TLVs
#[derive(Clone, Debug)]
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

struct Header {
    tag: Tag,
    /// `None` for the indefinite form
    length: Option<usize>,
    header_len: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_base(data, 0)
    }

    /// Reader whose offsets are reported relative to `base`
    pub fn with_base(data: &'a [u8], base: usize) -> Self {
        Self { data, pos: 0, base }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Absolute offset of the next octet
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    pub fn peek_tag(&self) -> DecodeResult<Option<Tag>> {
        if self.is_empty() {
            return Ok(None);
        }
        let (tag, _) = read_tag(self.data, self.pos, self.base)?;
        Ok(Some(tag))
    }

    pub fn read_tlv(&mut self) -> DecodeResult<Tlv<'a>> {
        let start = self.pos;
        let header = read_header(self.data, start, self.base)?;
        let content_start = start + header.header_len;

        let (content_len, trailer) = match header.length {
            Some(len) => (len, 0),
            None => {
                if !header.tag.constructed {
                    return Err(DecodeError::InvalidLength {
                        offset: self.base + start + header.header_len - 1,
                    });
                }
                (indefinite_len(self.data, content_start, self.base, 0)?, 2)
            }
        };

        let end = content_start.saturating_add(content_len);
        if end.saturating_add(trailer) > self.data.len() {
            return Err(DecodeError::Truncated {
                offset: self.base + start,
                needed: end.saturating_add(trailer) - self.data.len(),
            });
        }

        self.pos = end + trailer;
        Ok(Tlv {
            tag: header.tag,
            offset: self.base + start,
            content_offset: self.base + content_start,
            content: &self.data[content_start..end],
        })
    }

    /// Read the next element, which must carry `id`
    pub fn expect(&mut self, id: TagId, field: &'static str) -> DecodeResult<Tlv<'a>> {
        match self.peek_tag()? {
            None => Err(DecodeError::MissingField { field }),
            Some(tag) if tag.id == id => self.read_tlv(),
            Some(tag) => Err(DecodeError::UnexpectedTag {
                offset: self.offset(),
                field,
                expected: id.to_string(),
                found: tag.id.to_string(),
            }),
        }
    }

    /// Read the next element if it carries `id`
    pub fn optional(&mut self, id: TagId) -> DecodeResult<Option<Tlv<'a>>> {
        match self.peek_tag()? {
            Some(tag) if tag.id == id => self.read_tlv().map(Some),
            _ => Ok(None),
        }
    }

    /// Skip trailing extension fields of a SEQUENCE
    ///
    /// Only context-tagged elements are accepted as extensions; anything else
    /// means the content does not match the schema.
    pub fn skip_extensions(&mut self, field: &'static str) -> DecodeResult<()> {
        while let Some(tag) = self.peek_tag()? {
            if tag.id.class != Class::Context {
                return Err(DecodeError::UnexpectedTag {
                    offset: self.offset(),
                    field,
                    expected: "end of sequence".to_string(),
                    found: tag.id.to_string(),
                });
            }
            self.read_tlv()?;
        }
        Ok(())
    }
}

impl<'a> Tlv<'a> {
    /// Reader over the children of a constructed element
    pub fn children(&self, field: &'static str) -> DecodeResult<Reader<'a>> {
        if !self.tag.constructed {
            return Err(DecodeError::InvalidValue {
                field,
                reason: format!("expected constructed encoding at offset {}", self.offset),
            });
        }
        Ok(Reader::with_base(self.content, self.content_offset))
    }

    fn primitive(&self, field: &'static str) -> DecodeResult<&'a [u8]> {
        if self.tag.constructed {
            return Err(DecodeError::InvalidValue {
                field,
                reason: format!("expected primitive encoding at offset {}", self.offset),
            });
        }
        Ok(self.content)
    }

    /// Two's-complement INTEGER or ENUMERATED content
    pub fn integer(&self, field: &'static str) -> DecodeResult<i64> {
        let bytes = self.primitive(field)?;
        if bytes.is_empty() || bytes.len() > 8 {
            return Err(DecodeError::InvalidValue {
                field,
                reason: format!("integer of {} octets at offset {}", bytes.len(), self.offset),
            });
        }

        let mut value: i64 = if bytes[0] & 0x80 != 0 { -1 } else { 0 };
        for &b in bytes {
            value = (value << 8) | i64::from(b);
        }
        Ok(value)
    }

    pub fn u32(&self, field: &'static str) -> DecodeResult<u32> {
        let value = self.integer(field)?;
        u32::try_from(value).map_err(|_| DecodeError::InvalidValue {
            field,
            reason: format!("{} out of range at offset {}", value, self.offset),
        })
    }

    pub fn visible_string(&self, field: &'static str) -> DecodeResult<String> {
        let bytes = self.primitive(field)?;
        if let Some(pos) = bytes.iter().position(|b| !(0x20..=0x7e).contains(b)) {
            return Err(DecodeError::InvalidValue {
                field,
                reason: format!(
                    "non-printable octet 0x{:02x} at offset {}",
                    bytes[pos],
                    self.content_offset + pos
                ),
            });
        }
        Ok(bytes.iter().map(|&b| char::from(b)).collect())
    }

    pub fn octets(&self, field: &'static str) -> DecodeResult<&'a [u8]> {
        self.primitive(field)
    }
}

fn read_tag(data: &[u8], pos: usize, base: usize) -> DecodeResult<(Tag, usize)> {
    let first = *data.get(pos).ok_or(DecodeError::Truncated {
        offset: base + pos,
        needed: 1,
    })?;

    let class = match first >> 6 {
        0 => Class::Universal,
        1 => Class::Application,
        2 => Class::Context,
        _ => Class::Private,
    };
    let constructed = first & 0x20 != 0;

    let mut number = u32::from(first & 0x1f);
    let mut len = 1;
    if number == 0x1f {
        // High-tag-number form: base-128, high bit marks continuation
        number = 0;
        loop {
            let b = *data.get(pos + len).ok_or(DecodeError::Truncated {
                offset: base + pos,
                needed: 1,
            })?;
            len += 1;
            if number > (u32::MAX >> 7) {
                return Err(DecodeError::InvalidValue {
                    field: "tag",
                    reason: format!("tag number overflow at offset {}", base + pos),
                });
            }
            number = (number << 7) | u32::from(b & 0x7f);
            if b & 0x80 == 0 {
                break;
            }
        }
    }

    Ok((
        Tag {
            id: TagId { class, number },
            constructed,
        },
        len,
    ))
}

fn read_header(data: &[u8], pos: usize, base: usize) -> DecodeResult<Header> {
    let (tag, tag_len) = read_tag(data, pos, base)?;
    let len_pos = pos + tag_len;
    let first = *data.get(len_pos).ok_or(DecodeError::Truncated {
        offset: base + pos,
        needed: 1,
    })?;

    if first & 0x80 == 0 {
        return Ok(Header {
            tag,
            length: Some(usize::from(first)),
            header_len: tag_len + 1,
        });
    }

    let octets = usize::from(first & 0x7f);
    if octets == 0 {
        return Ok(Header {
            tag,
            length: None,
            header_len: tag_len + 1,
        });
    }
    if octets > MAX_LENGTH_OCTETS || first == 0xff {
        return Err(DecodeError::InvalidLength {
            offset: base + len_pos,
        });
    }

    let bytes = data
        .get(len_pos + 1..len_pos + 1 + octets)
        .ok_or_else(|| DecodeError::Truncated {
            offset: base + pos,
            needed: (len_pos + 1 + octets).saturating_sub(data.len()),
        })?;
    let length = bytes
        .iter()
        .fold(0usize, |acc, &b| (acc << 8) | usize::from(b));

    Ok(Header {
        tag,
        length: Some(length),
        header_len: tag_len + 1 + octets,
    })
}

/// Content length of an indefinite-length value starting at `start`,
/// excluding the end-of-contents octets
fn indefinite_len(data: &[u8], start: usize, base: usize, depth: usize) -> DecodeResult<usize> {
    if depth > MAX_DEPTH {
        return Err(DecodeError::InvalidLength {
            offset: base + start,
        });
    }

    let mut pos = start;
    loop {
        match data.get(pos..pos + 2) {
            Some([0, 0]) => return Ok(pos - start),
            Some(_) => {}
            None => {
                return Err(DecodeError::Truncated {
                    offset: base + start,
                    needed: pos + 2 - data.len(),
                });
            }
        }

        let header = read_header(data, pos, base)?;
        let content_start = pos + header.header_len;
        pos = match header.length {
            Some(len) => content_start.saturating_add(len),
            None => content_start + indefinite_len(data, content_start, base, depth + 1)? + 2,
        };
        if pos > data.len() {
            return Err(DecodeError::Truncated {
                offset: base + start,
                needed: pos - data.len(),
            });
        }
    }
}
