use std::borrow::Cow;
use std::io::Read;

use flate2::read::GzDecoder;

/// Find byte pattern in haystack
pub fn find_pattern(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Decode HTTP chunked transfer encoding. Chunk extensions are ignored and
/// decoding stops at the last-chunk marker or at the first malformed size
/// line; a truncated final chunk yields what was received.
pub fn decode_chunked_body(buffer: &[u8]) -> Cow<'_, [u8]> {
    if find_pattern(buffer, b"\r\n").is_none() {
        return Cow::Borrowed(buffer);
    }

    let mut result = Vec::with_capacity(buffer.len());
    let mut pos = 0;

    while pos < buffer.len() {
        let size_end = match find_pattern(&buffer[pos..], b"\r\n") {
            Some(i) => pos + i,
            None => break,
        };

        let size_line = String::from_utf8_lossy(&buffer[pos..size_end]);
        let size_str = size_line.split(';').next().unwrap_or_default();
        let chunk_size = match usize::from_str_radix(size_str.trim(), 16) {
            Ok(n) => n,
            Err(_) => break,
        };

        if chunk_size == 0 {
            break;
        }

        let data_start = size_end + 2;
        let Some(data_end) = data_start
            .checked_add(chunk_size)
            .filter(|end| *end <= buffer.len())
        else {
            result.extend_from_slice(&buffer[data_start.min(buffer.len())..]);
            break;
        };

        result.extend_from_slice(&buffer[data_start..data_end]);
        pos = data_end.saturating_add(2);
    }

    Cow::Owned(result)
}

/// Decompress gzip data
pub fn decompress_gzip(data: &[u8]) -> Result<Vec<u8>, std::io::Error> {
    let mut decoder = GzDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed)?;
    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    #[test]
    fn test_find_pattern() {
        assert_eq!(find_pattern(b"HTTP/1.1 200 OK\r\n\r\nbody", b"\r\n\r\n"), Some(15));
        assert_eq!(find_pattern(b"abc", b"x"), None);
    }

    #[test]
    fn test_decode_chunked_body() {
        let body = b"4\r\nWiki\r\n5;ext=1\r\npedia\r\n0\r\n\r\n";
        assert_eq!(decode_chunked_body(body).as_ref(), b"Wikipedia");
    }

    #[test]
    fn test_decode_chunked_body_huge_size() {
        let body = b"ffffffffffffffff\r\nabc\r\n0\r\n\r\n";
        assert_eq!(decode_chunked_body(body).as_ref(), b"abc\r\n0\r\n\r\n");
    }

    #[test]
    fn test_decode_truncated_chunk() {
        let body = b"a\r\nhello";
        assert_eq!(decode_chunked_body(body).as_ref(), b"hello");
    }

    #[test]
    fn test_decode_empty_chunked_body() {
        assert_eq!(decode_chunked_body(b"0\r\n\r\n").as_ref(), b"");
    }

    #[test]
    fn test_decompress_gzip() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"hello, world").unwrap();
        let compressed = encoder.finish().unwrap();

        assert_eq!(decompress_gzip(&compressed).unwrap(), b"hello, world");
        assert!(decompress_gzip(b"not gzip").is_err());
    }
}
