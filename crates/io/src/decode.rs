use std::path::Path;

use crate::error::IoError;

/// Read a file as text. The ERP exports are usually Windows-1252/Latin-1;
/// valid UTF-8 is kept as is.
pub fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let bytes = std::fs::read(path).map_err(|source| IoError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(decode_bytes(bytes))
}

/// UTF-8 first; on failure, recover the buffer from the error and decode it
/// as Windows-1252, which maps every byte.
pub fn decode_bytes(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn utf8_passes_through() {
        assert_eq!(decode_bytes("Situação".as_bytes().to_vec()), "Situação");
    }

    #[test]
    fn latin1_bytes_are_decoded() {
        // "Situação" in ISO-8859-1
        let bytes = vec![b'S', b'i', b't', b'u', b'a', 0xE7, 0xE3, b'o'];
        assert_eq!(decode_bytes(bytes), "Situação");
    }

    #[test]
    fn windows_1252_specials() {
        // 0x80 is the euro sign in Windows-1252
        assert_eq!(decode_bytes(vec![0x80, b'1']), "€1");
    }

    #[test]
    fn reads_file_from_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("status.csv");
        fs::write(&path, [b'N', b'a', 0xE7, 0xE3, b'o']).unwrap();
        assert_eq!(read_file_as_utf8(&path).unwrap(), "Nação");
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = read_file_as_utf8(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, IoError::Read { .. }));
        assert!(err.to_string().contains("nope.csv"));
    }
}
