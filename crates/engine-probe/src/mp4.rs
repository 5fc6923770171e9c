// ISO base media (MP4/MOV) inspection
// Walks the box tree just far enough to find track geometry and duration

use crate::source::ByteSource;
use cinescope_core::{AssetInfo, EngineError, EngineResult, TrackInfo, TrackKind};

/// Largest `moov` box we are willing to pull into memory
const MAX_MOOV_SIZE: u64 = 64 * 1024 * 1024;

/// Maximum number of top-level boxes to walk before giving up
const MAX_TOP_LEVEL_BOXES: usize = 64;

/// Box header as found in the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BoxHeader {
    box_type: [u8; 4],
    /// Header length (8, or 16 with a 64-bit size)
    header_len: u64,
    /// Total size including the header; `None` means "to end of file"
    size: Option<u64>,
}

/// Parse a box header at the start of `data`
fn parse_box_header(data: &[u8]) -> Option<BoxHeader> {
    if data.len() < 8 {
        return None;
    }

    let size32 = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as u64;
    let mut box_type = [0u8; 4];
    box_type.copy_from_slice(&data[4..8]);

    match size32 {
        0 => Some(BoxHeader {
            box_type,
            header_len: 8,
            size: None,
        }),
        1 => {
            if data.len() < 16 {
                return None;
            }
            let size = read_u64(data, 8)?;
            if size < 16 {
                return None;
            }
            Some(BoxHeader {
                box_type,
                header_len: 16,
                size: Some(size),
            })
        }
        s if s < 8 => None,
        s => Some(BoxHeader {
            box_type,
            header_len: 8,
            size: Some(s),
        }),
    }
}

fn read_u32(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn read_u64(data: &[u8], offset: usize) -> Option<u64> {
    let bytes = data.get(offset..offset + 8)?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    Some(u64::from_be_bytes(buf))
}

/// 16.16 fixed point, as used by `tkhd` width/height
fn read_fixed_16_16(data: &[u8], offset: usize) -> Option<f64> {
    read_u32(data, offset).map(|v| v as f64 / 65536.0)
}

/// Iterate over the child boxes of an in-memory container body
struct Children<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Children<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }
}

impl<'a> Iterator for Children<'a> {
    type Item = ([u8; 4], &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.data.get(self.pos..)?;
        let header = parse_box_header(rest)?;
        let size = header.size.unwrap_or(rest.len() as u64) as usize;
        if size > rest.len() || (size as u64) < header.header_len {
            // Truncated child, stop walking
            return None;
        }
        let body = &rest[header.header_len as usize..size];
        self.pos += size;
        Some((header.box_type, body))
    }
}

fn find_child<'a>(data: &'a [u8], box_type: &[u8; 4]) -> Option<&'a [u8]> {
    Children::new(data)
        .find(|(kind, _)| kind == box_type)
        .map(|(_, body)| body)
}

fn malformed_size() -> EngineError {
    EngineError::new("malformed box size")
}

/// Locate the top-level `moov` box and return its body
fn read_moov(source: &mut dyn ByteSource) -> EngineResult<Vec<u8>> {
    let total_len = source.len();
    let mut offset = 0u64;

    for _ in 0..MAX_TOP_LEVEL_BOXES {
        if let Some(len) = total_len {
            if offset.checked_add(8).map_or(true, |end| end > len) {
                break;
            }
        }

        let head = source.read_at(offset, 16)?;
        let header = match parse_box_header(&head) {
            Some(h) => h,
            None => break,
        };

        log::debug!(
            "[probe] top-level box '{}' at {} size {:?}",
            String::from_utf8_lossy(&header.box_type),
            offset,
            header.size
        );

        let size = match (header.size, total_len) {
            (Some(s), _) => s,
            (None, Some(len)) => len - offset,
            (None, None) => {
                if &header.box_type == b"moov" {
                    MAX_MOOV_SIZE
                } else {
                    break;
                }
            }
        };

        if &header.box_type == b"moov" {
            let body_len = size - header.header_len;
            if body_len > MAX_MOOV_SIZE {
                return Err(EngineError::new(format!("moov box too large ({} bytes)", body_len)));
            }
            let body_start = offset.checked_add(header.header_len).ok_or_else(malformed_size)?;
            return source.read_at(body_start, body_len as usize);
        }

        offset = offset.checked_add(size).ok_or_else(malformed_size)?;
    }

    Err(EngineError::new("No moov box found"))
}

/// Movie duration from `mvhd`, in seconds
fn parse_mvhd(body: &[u8]) -> Option<f64> {
    let version = *body.first()?;
    let (timescale, duration) = if version == 1 {
        let timescale = read_u32(body, 20)?;
        let duration = read_u64(body, 24)?;
        if duration == u64::MAX {
            return Some(f64::INFINITY);
        }
        (timescale, duration)
    } else {
        let timescale = read_u32(body, 12)?;
        let duration = read_u32(body, 16)?;
        if duration == u32::MAX {
            return Some(f64::INFINITY);
        }
        (timescale, duration as u64)
    };

    if timescale == 0 {
        return None;
    }
    Some(duration as f64 / timescale as f64)
}

/// Natural size from `tkhd`
fn parse_tkhd(body: &[u8]) -> Option<(f64, f64)> {
    let version = *body.first()?;
    let width_offset = if version == 1 { 88 } else { 76 };
    let width = read_fixed_16_16(body, width_offset)?;
    let height = read_fixed_16_16(body, width_offset + 4)?;
    Some((width, height))
}

/// Track kind from `mdia/hdlr`
fn parse_handler(mdia: &[u8]) -> TrackKind {
    let handler = find_child(mdia, b"hdlr").and_then(|hdlr| hdlr.get(8..12));
    match handler {
        Some(b"vide") => TrackKind::Video,
        Some(b"soun") => TrackKind::Audio,
        _ => TrackKind::Other,
    }
}

/// Extract tracks and duration from a `moov` body
pub fn parse_moov(moov: &[u8]) -> EngineResult<AssetInfo> {
    let duration_secs = find_child(moov, b"mvhd")
        .and_then(parse_mvhd)
        .ok_or_else(|| EngineError::new("Missing or malformed mvhd box"))?;

    let mut tracks = Vec::new();
    for (kind, trak) in Children::new(moov) {
        if &kind != b"trak" {
            continue;
        }

        let (natural_width, natural_height) = find_child(trak, b"tkhd")
            .and_then(parse_tkhd)
            .unwrap_or((0.0, 0.0));
        let kind = find_child(trak, b"mdia")
            .map(parse_handler)
            .unwrap_or(TrackKind::Other);

        tracks.push(TrackInfo {
            kind,
            natural_width,
            natural_height,
        });
    }

    Ok(AssetInfo {
        tracks,
        duration_secs,
    })
}

/// Inspect an asset: find `moov` and extract track info
pub fn inspect(source: &mut dyn ByteSource) -> EngineResult<AssetInfo> {
    let moov = read_moov(source)?;
    let info = parse_moov(&moov)?;
    log::info!(
        "[probe] asset has {} tracks, duration {:.3}s",
        info.tracks.len(),
        info.duration_secs
    );
    Ok(info)
}


#[cfg(test)]
mod tests {
    use super::fixture::*;
    use super::*;
    use crate::source::MemorySource;

    #[test]
    fn test_parse_box_header_sizes() {
        let h = parse_box_header(&boxed(b"free", &[0u8; 4])).unwrap();
        assert_eq!(h.size, Some(12));
        assert_eq!(h.header_len, 8);

        let mut large = vec![0, 0, 0, 1];
        large.extend_from_slice(b"mdat");
        large.extend_from_slice(&32u64.to_be_bytes());
        let h = parse_box_header(&large).unwrap();
        assert_eq!(h.size, Some(32));
        assert_eq!(h.header_len, 16);

        assert!(parse_box_header(&[0, 0, 0, 4, b'b', b'a', b'd', b'!']).is_none());
    }

    #[test]
    fn test_inspect_moov_at_end() {
        let data = movie(
            600,
            6000,
            &[trak(b"soun", 0, 0), trak(b"vide", 1920, 1080)],
        );
        let mut source = MemorySource::new(data);
        let info = inspect(&mut source).unwrap();

        assert_eq!(info.tracks.len(), 2);
        assert_eq!(info.tracks[0].kind, TrackKind::Audio);
        assert_eq!(info.tracks[1].kind, TrackKind::Video);
        assert_eq!(info.tracks[1].natural_width, 1920.0);
        assert_eq!(info.tracks[1].natural_height, 1080.0);
        assert!((info.duration_secs - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_moov() {
        let mut data = boxed(b"ftyp", b"isom");
        data.extend(boxed(b"mdat", &[0u8; 64]));
        let err = inspect(&mut MemorySource::new(data)).unwrap_err();
        assert_eq!(err.to_string(), "No moov box found");
    }

    #[test]
    fn test_oversized_largesize_box() {
        let mut data = boxed(b"ftyp", b"isom");
        data.extend_from_slice(&[0, 0, 0, 1]);
        data.extend_from_slice(b"free");
        data.extend_from_slice(&(u64::MAX - 3).to_be_bytes());
        data.extend_from_slice(&[0u8; 32]);

        let err = inspect(&mut MemorySource::new(data)).unwrap_err();
        assert_eq!(err.to_string(), "malformed box size");
    }

    #[test]
    fn test_indefinite_duration() {
        let moov = {
            let mut body = mvhd_v0(1000, u32::MAX);
            body.extend(trak(b"vide", 640, 360));
            body
        };
        let info = parse_moov(&moov).unwrap();
        assert!(info.duration_secs.is_infinite());
    }

    #[test]
    fn test_truncated_child_stops_walk() {
        let mut moov = mvhd_v0(1000, 1000);
        let mut broken = trak(b"vide", 10, 10);
        broken.truncate(broken.len() - 5);
        moov.extend(broken);
        let info = parse_moov(&moov).unwrap();
        assert!(info.tracks.is_empty());
    }
}
