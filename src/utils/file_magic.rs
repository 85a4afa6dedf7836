//! 上传文件的内容嗅探
//!
//! 扩展名由客户端提供，不可信；这里按文件头判断真实类型，
//! 并据此给出下载时使用的 Content-Type。

struct Signature {
    offset: usize,
    bytes: &'static [u8],
}

const fn sig(offset: usize, bytes: &'static [u8]) -> Signature {
    Signature { offset, bytes }
}

/// 二进制格式：扩展名 -> (MIME, 可接受的文件头)
const BINARY_KINDS: &[(&str, &str, &[Signature])] = &[
    (".png", "image/png", &[sig(0, &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A])]),
    (".jpg", "image/jpeg", &[sig(0, &[0xFF, 0xD8, 0xFF])]),
    (".jpeg", "image/jpeg", &[sig(0, &[0xFF, 0xD8, 0xFF])]),
    (".gif", "image/gif", &[sig(0, b"GIF87a"), sig(0, b"GIF89a")]),
    (".webp", "image/webp", &[sig(8, b"WEBP")]),
    (".pdf", "application/pdf", &[sig(0, b"%PDF")]),
    (".doc", "application/msword", &[sig(0, &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1])]),
    (".xls", "application/vnd.ms-excel", &[sig(0, &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1])]),
    (".ppt", "application/vnd.ms-powerpoint", &[sig(0, &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1])]),
    (
        ".docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        &[sig(0, b"PK\x03\x04")],
    ),
    (
        ".xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        &[sig(0, b"PK\x03\x04")],
    ),
    (
        ".pptx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        &[sig(0, b"PK\x03\x04")],
    ),
    (".odt", "application/vnd.oasis.opendocument.text", &[sig(0, b"PK\x03\x04")]),
    (".zip", "application/zip", &[sig(0, b"PK\x03\x04")]),
    (".mp3", "audio/mpeg", &[sig(0, b"ID3"), sig(0, &[0xFF, 0xFB])]),
    (".mp4", "video/mp4", &[sig(4, b"ftyp")]),
];

/// 纯文本格式不检查文件头，但拒绝包含 NUL 的内容
const TEXT_KINDS: &[(&str, &str)] = &[
    (".txt", "text/plain; charset=utf-8"),
    (".md", "text/markdown; charset=utf-8"),
    (".csv", "text/csv; charset=utf-8"),
];

fn matches(data: &[u8], signature: &Signature) -> bool {
    data.len() >= signature.offset + signature.bytes.len()
        && &data[signature.offset..signature.offset + signature.bytes.len()] == signature.bytes
}

/// 文件头是否与扩展名（含点号，如 ".pdf"）一致
///
/// `data` 只需要文件的前若干字节。未知扩展名一律拒绝。
pub fn validate_magic_bytes(data: &[u8], extension: &str) -> bool {
    if data.is_empty() {
        return false;
    }
    let ext = extension.to_ascii_lowercase();

    if let Some((_, _, signatures)) = BINARY_KINDS.iter().find(|(e, _, _)| *e == ext) {
        return signatures.iter().any(|s| matches(data, s));
    }
    if TEXT_KINDS.iter().any(|(e, _)| *e == ext) {
        return !data.contains(&0);
    }
    false
}

/// 扩展名对应的 MIME 类型
pub fn content_type_for(extension: &str) -> &'static str {
    let ext = extension.to_ascii_lowercase();
    BINARY_KINDS
        .iter()
        .find(|(e, _, _)| *e == ext)
        .map(|(_, mime, _)| *mime)
        .or_else(|| {
            TEXT_KINDS
                .iter()
                .find(|(e, _)| *e == ext)
                .map(|(_, mime)| *mime)
        })
        .unwrap_or("application/octet-stream")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_header() {
        assert!(validate_magic_bytes(b"%PDF-1.7\n", ".pdf"));
        assert!(validate_magic_bytes(b"%PDF-1.7\n", ".PDF"));
        assert!(!validate_magic_bytes(b"%PDF-1.7\n", ".docx"));
    }

    #[test]
    fn test_office_zip_containers() {
        let header = b"PK\x03\x04\x14\x00";
        assert!(validate_magic_bytes(header, ".docx"));
        assert!(validate_magic_bytes(header, ".xlsx"));
        assert!(!validate_magic_bytes(header, ".doc"));
    }

    #[test]
    fn test_offset_signatures() {
        let webp = b"RIFF\x24\x00\x00\x00WEBPVP8 ";
        assert!(validate_magic_bytes(webp, ".webp"));
        assert!(!validate_magic_bytes(b"RIFF", ".webp"));

        let mp4 = b"\x00\x00\x00\x18ftypmp42";
        assert!(validate_magic_bytes(mp4, ".mp4"));
    }

    #[test]
    fn test_text_rejects_binary() {
        assert!(validate_magic_bytes(b"Lista de exercicios", ".txt"));
        assert!(!validate_magic_bytes(b"MZ\x00\x00", ".txt"));
    }

    #[test]
    fn test_unknown_and_empty() {
        assert!(!validate_magic_bytes(b"MZ\x90\x00", ".exe"));
        assert!(!validate_magic_bytes(&[], ".pdf"));
    }

    #[test]
    fn test_content_type_lookup() {
        assert_eq!(content_type_for(".PDF"), "application/pdf");
        assert_eq!(content_type_for(".md"), "text/markdown; charset=utf-8");
        assert_eq!(content_type_for(".bin"), "application/octet-stream");
    }
}
