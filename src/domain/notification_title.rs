use unicode_segmentation::UnicodeSegmentation;

/// A validated notification title: non-empty, at most 256 graphemes, no
/// markup characters (the title is rendered verbatim by the device's
/// notification UI).
#[derive(Debug)]
pub struct NotificationTitle(String);

impl NotificationTitle {
    pub fn parse(s: String) -> Result<NotificationTitle, String> {
        let is_empty_or_whitespace = s.trim().is_empty();
        let is_too_long = s.graphemes(true).count() > 256;
        let forbidden_characters = ['<', '>', '\\', '{', '}'];
        let contains_forbidden_characters = s.chars().any(|c| forbidden_characters.contains(&c));

        if is_empty_or_whitespace || is_too_long || contains_forbidden_characters {
            Err(format!("{} is not a valid notification title.", s))
        } else {
            Ok(Self(s))
        }
    }
}

impl AsRef<str> for NotificationTitle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
