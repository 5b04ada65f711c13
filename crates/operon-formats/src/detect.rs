use crate::ResponseFormat;

/// Classify an E-utilities response body.
///
/// efetch answers some failures with HTTP 200 and a plain-text or XML error
/// body, so the status code alone is not enough.
pub fn detect_response(content: &str) -> ResponseFormat {
    let trimmed = content.trim_start();

    if trimmed.is_empty() {
        ResponseFormat::Empty
    } else if trimmed.starts_with('>') {
        ResponseFormat::Fasta
    } else if trimmed.starts_with("Error") || trimmed.contains("<ERROR>") {
        ResponseFormat::ErrorMessage
    } else if trimmed.contains("<IPGReportSet") {
        ResponseFormat::IpgXml
    } else {
        ResponseFormat::Unknown
    }
}

/// Extract the provider's error text, if the body is an error payload.
pub fn error_message(content: &str) -> Option<String> {
    if detect_response(content) != ResponseFormat::ErrorMessage {
        return None;
    }

    let trimmed = content.trim();
    if let Some(start) = trimmed.find("<ERROR>") {
        let rest = &trimmed[start + "<ERROR>".len()..];
        let end = rest.find("</ERROR>").unwrap_or(rest.len());
        return Some(rest[..end].trim().to_string());
    }

    Some(trimmed.lines().next().unwrap_or_default().trim().to_string())
}
