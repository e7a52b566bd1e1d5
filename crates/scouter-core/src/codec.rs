//! Binary encoding of [`Candidate`] and [`MVCandidate`].
//!
//! Every buffer starts with an 8-byte header followed by fixed-width
//! little-endian fields:
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       4     total buffer length (header included)
//! 4       1     format version (1)
//! 5       1     kind (1 = candidate, 2 = mv-candidate)
//! 6       2     field count (11 = candidate, 14 = mv-candidate)
//! ```
//!
//! Candidate body (42 bytes):
//!
//! ```text
//! i32 x, i32 y, i32 width, i32 height, f32 score,
//! i32 offset_x, i32 offset_y,
//! u8  flags (bit 0: height present, bit 1: ground present),
//! f32 height, f32 ground_x, f32 ground_y,
//! u8  verdict (0 = not evaluated, 1 = accepted, 2 = rejected)
//! ```
//!
//! Mv-candidate body: `i32 camera_id, u8 has_correlation, u32 correlation,
//! u32 view_count`, the representative candidate body, then `view_count`
//! repetitions of `i32 camera_id, u32 index` plus a candidate body.
//!
//! Absent optional values are written as zero with their flag bit cleared.

use std::io::Cursor;

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use nalgebra::Point2;

use crate::{Candidate, MVCandidate, MaskVerdict, Rect, View};

pub const FORMAT_VERSION: u8 = 1;
pub const HEADER_LEN: usize = 8;
pub const CANDIDATE_BODY_LEN: usize = 42;

const KIND_CANDIDATE: u8 = 1;
const KIND_MV_CANDIDATE: u8 = 2;
const CANDIDATE_FIELDS: u16 = 11;
const MV_CANDIDATE_FIELDS: u16 = 14;
const MV_FIXED_LEN: usize = 13;
const VIEW_LEN: usize = 8 + CANDIDATE_BODY_LEN;

const FLAG_HEIGHT: u8 = 0b01;
const FLAG_GROUND: u8 = 0b10;

/// Decoding failures. Every variant is a malformed-data condition.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("malformed data: buffer too short (needed {needed} bytes, got {got})")]
    Truncated { needed: usize, got: usize },
    #[error("malformed data: declared length {declared} does not match buffer length {actual}")]
    LengthMismatch { declared: usize, actual: usize },
    #[error("malformed data: unsupported format version {0}")]
    UnsupportedVersion(u8),
    #[error("malformed data: expected record kind {expected}, got {got}")]
    UnexpectedKind { expected: u8, got: u8 },
    #[error("malformed data: expected {expected} fields, got {got}")]
    FieldCount { expected: u16, got: u16 },
    #[error("malformed data: invalid value for field `{field}`")]
    InvalidField { field: &'static str },
}

struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn with_header(kind: u8, fields: u16, capacity: usize) -> Self {
        let mut w = Self {
            buf: Vec::with_capacity(capacity),
        };
        w.u32(0); // patched in `finish`
        w.u8(FORMAT_VERSION);
        w.u8(kind);
        w.u16(fields);
        w
    }

    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn u16(&mut self, v: u16) {
        let mut b = [0u8; 2];
        LittleEndian::write_u16(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    fn u32(&mut self, v: u32) {
        let mut b = [0u8; 4];
        LittleEndian::write_u32(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    fn i32(&mut self, v: i32) {
        let mut b = [0u8; 4];
        LittleEndian::write_i32(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    fn f32(&mut self, v: f32) {
        let mut b = [0u8; 4];
        LittleEndian::write_f32(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    fn candidate_body(&mut self, c: &Candidate) {
        let r = c.rect();
        self.i32(r.x);
        self.i32(r.y);
        self.i32(r.width);
        self.i32(r.height);
        self.f32(c.score());
        let [ox, oy] = c.offset();
        self.i32(ox);
        self.i32(oy);

        let mut flags = 0u8;
        if c.height().is_some() {
            flags |= FLAG_HEIGHT;
        }
        if c.ground().is_some() {
            flags |= FLAG_GROUND;
        }
        self.u8(flags);
        self.f32(c.height().unwrap_or(0.0));
        let g = c.ground().unwrap_or_else(|| Point2::new(0.0, 0.0));
        self.f32(g.x);
        self.f32(g.y);
        self.u8(c.verdict().to_byte());
    }

    fn finish(mut self) -> Vec<u8> {
        // Buffers are bounded by view counts that fit in u32.
        let len = self.buf.len() as u32;
        LittleEndian::write_u32(&mut self.buf[0..4], len);
        self.buf
    }
}

/// Encode a candidate into its canonical byte form.
pub fn serialize_candidate(c: &Candidate) -> Vec<u8> {
    let mut w = Writer::with_header(
        KIND_CANDIDATE,
        CANDIDATE_FIELDS,
        HEADER_LEN + CANDIDATE_BODY_LEN,
    );
    w.candidate_body(c);
    w.finish()
}

/// Encode a multi-view candidate, including every contributing view.
pub fn serialize_mv_candidate(c: &MVCandidate) -> Vec<u8> {
    let views = c.views();
    let mut w = Writer::with_header(
        KIND_MV_CANDIDATE,
        MV_CANDIDATE_FIELDS,
        HEADER_LEN + MV_FIXED_LEN + CANDIDATE_BODY_LEN + views.len() * VIEW_LEN,
    );
    w.i32(c.camera_id());
    w.u8(u8::from(c.correlation().is_some()));
    w.u32(c.correlation().unwrap_or(0));
    w.u32(views.len() as u32);
    w.candidate_body(c.candidate());
    for v in views {
        w.i32(v.camera_id);
        w.u32(v.index);
        w.candidate_body(&v.candidate);
    }
    w.finish()
}

fn read_header(src: &[u8], kind: u8, fields: u16) -> Result<Cursor<&[u8]>, CodecError> {
    if src.len() < HEADER_LEN {
        return Err(CodecError::Truncated {
            needed: HEADER_LEN,
            got: src.len(),
        });
    }
    let declared = LittleEndian::read_u32(&src[0..4]) as usize;
    if declared != src.len() {
        return Err(CodecError::LengthMismatch {
            declared,
            actual: src.len(),
        });
    }
    if src[4] != FORMAT_VERSION {
        return Err(CodecError::UnsupportedVersion(src[4]));
    }
    if src[5] != kind {
        return Err(CodecError::UnexpectedKind {
            expected: kind,
            got: src[5],
        });
    }
    let got = LittleEndian::read_u16(&src[6..8]);
    if got != fields {
        return Err(CodecError::FieldCount {
            expected: fields,
            got,
        });
    }
    let mut cur = Cursor::new(src);
    cur.set_position(HEADER_LEN as u64);
    Ok(cur)
}

fn expect_len(src: &[u8], needed: usize) -> Result<(), CodecError> {
    match src.len() {
        got if got < needed => Err(CodecError::Truncated { needed, got }),
        got if got > needed => Err(CodecError::LengthMismatch {
            declared: needed,
            actual: got,
        }),
        _ => Ok(()),
    }
}

fn truncated(cur: &Cursor<&[u8]>) -> CodecError {
    let got = cur.get_ref().len();
    CodecError::Truncated {
        needed: got + 1,
        got,
    }
}

fn read_candidate_body(cur: &mut Cursor<&[u8]>) -> Result<Candidate, CodecError> {
    macro_rules! rd {
        ($e:expr) => {
            $e.map_err(|_| truncated(cur))?
        };
    }
    let x = rd!(cur.read_i32::<LittleEndian>());
    let y = rd!(cur.read_i32::<LittleEndian>());
    let width = rd!(cur.read_i32::<LittleEndian>());
    let height = rd!(cur.read_i32::<LittleEndian>());
    let score = rd!(cur.read_f32::<LittleEndian>());
    let ox = rd!(cur.read_i32::<LittleEndian>());
    let oy = rd!(cur.read_i32::<LittleEndian>());
    let flags = rd!(cur.read_u8());
    let h = rd!(cur.read_f32::<LittleEndian>());
    let gx = rd!(cur.read_f32::<LittleEndian>());
    let gy = rd!(cur.read_f32::<LittleEndian>());
    let verdict = rd!(cur.read_u8());

    let mut c = Candidate::new(Rect::new(x, y, width, height), score)
        .map_err(|_| CodecError::InvalidField { field: "rect" })?
        .with_offset([ox, oy]);

    match flags {
        0 => {}
        f if f == FLAG_HEIGHT | FLAG_GROUND => c
            .set_height_estimate(h, Point2::new(gx, gy))
            .map_err(|_| CodecError::InvalidField { field: "height" })?,
        _ => return Err(CodecError::InvalidField { field: "flags" }),
    }

    let verdict =
        MaskVerdict::from_byte(verdict).ok_or(CodecError::InvalidField { field: "verdict" })?;
    c.set_verdict(verdict);
    Ok(c)
}

/// Decode a candidate produced by [`serialize_candidate`].
pub fn deserialize_candidate(src: &[u8]) -> Result<Candidate, CodecError> {
    let mut cur = read_header(src, KIND_CANDIDATE, CANDIDATE_FIELDS)?;
    expect_len(src, HEADER_LEN + CANDIDATE_BODY_LEN)?;
    read_candidate_body(&mut cur)
}

/// Decode a multi-view candidate produced by [`serialize_mv_candidate`].
pub fn deserialize_mv_candidate(src: &[u8]) -> Result<MVCandidate, CodecError> {
    let mut cur = read_header(src, KIND_MV_CANDIDATE, MV_CANDIDATE_FIELDS)?;
    let fixed = HEADER_LEN + MV_FIXED_LEN + CANDIDATE_BODY_LEN;
    if src.len() < fixed {
        return Err(CodecError::Truncated {
            needed: fixed,
            got: src.len(),
        });
    }

    let camera_id = cur.read_i32::<LittleEndian>().map_err(|_| truncated(&cur))?;
    let has_correlation = cur.read_u8().map_err(|_| truncated(&cur))?;
    let correlation = cur.read_u32::<LittleEndian>().map_err(|_| truncated(&cur))?;
    let view_count = cur.read_u32::<LittleEndian>().map_err(|_| truncated(&cur))? as usize;
    let correlation = match has_correlation {
        0 => None,
        1 => Some(correlation),
        _ => {
            return Err(CodecError::InvalidField {
                field: "has_correlation",
            })
        }
    };

    // Validate the view count against the buffer before allocating.
    let needed = view_count
        .checked_mul(VIEW_LEN)
        .and_then(|n| n.checked_add(fixed))
        .ok_or(CodecError::InvalidField {
            field: "view_count",
        })?;
    expect_len(src, needed)?;

    let candidate = read_candidate_body(&mut cur)?;
    let mut views = Vec::with_capacity(view_count);
    for _ in 0..view_count {
        let cam = cur.read_i32::<LittleEndian>().map_err(|_| truncated(&cur))?;
        let index = cur.read_u32::<LittleEndian>().map_err(|_| truncated(&cur))?;
        let vc = read_candidate_body(&mut cur)?;
        views.push(View {
            camera_id: cam,
            index,
            candidate: vc,
        });
    }

    Ok(MVCandidate::from_parts(
        candidate,
        camera_id,
        correlation,
        views,
    ))
}

impl Candidate {
    /// Shorthand for [`serialize_candidate`].
    pub fn to_bytes(&self) -> Vec<u8> {
        serialize_candidate(self)
    }

    /// Shorthand for [`deserialize_candidate`].
    pub fn from_bytes(src: &[u8]) -> Result<Self, CodecError> {
        deserialize_candidate(src)
    }
}

impl MVCandidate {
    pub fn to_bytes(&self) -> Vec<u8> {
        serialize_mv_candidate(self)
    }

    pub fn from_bytes(src: &[u8]) -> Result<Self, CodecError> {
        deserialize_mv_candidate(src)
    }
}
