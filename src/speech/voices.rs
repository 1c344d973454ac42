//! Voice auto-selection

use super::platform::VoiceDescriptor;

fn is_english(voice: &VoiceDescriptor) -> bool {
    voice.lang.starts_with("en")
}

/// Pick the voice to use when the user has not chosen one.
///
/// Among English voices (lang starting with "en"): a Google voice for exactly
/// "en-US", then the platform default, then the first one. Without any
/// English voice, the first voice overall.
pub fn select_preferred_voice(voices: &[VoiceDescriptor]) -> Option<&VoiceDescriptor> {
    let english: Vec<&VoiceDescriptor> = voices.iter().filter(|v| is_english(v)).collect();

    english
        .iter()
        .find(|v| v.name.contains("Google") && v.lang == "en-US")
        .or_else(|| english.iter().find(|v| v.default))
        .or_else(|| english.first())
        .copied()
        .or_else(|| voices.first())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(uri: &str, name: &str, lang: &str, default: bool) -> VoiceDescriptor {
        VoiceDescriptor::new(uri, name, lang, default)
    }

    #[test]
    fn test_google_us_english_wins() {
        let voices = vec![
            voice("a", "Samantha", "en-US", true),
            voice("b", "Google US English", "en-US", false),
        ];
        assert_eq!(select_preferred_voice(&voices).unwrap().voice_uri, "b");
    }

    #[test]
    fn test_google_voice_must_be_exactly_en_us() {
        let voices = vec![
            voice("a", "Google UK English", "en-GB", false),
            voice("b", "Daniel", "en-GB", true),
        ];
        assert_eq!(select_preferred_voice(&voices).unwrap().voice_uri, "b");
    }

    #[test]
    fn test_first_english_without_default() {
        let voices = vec![
            voice("a", "Thomas", "fr-FR", true),
            voice("b", "Karen", "en-AU", false),
            voice("c", "Moira", "en-IE", false),
        ];
        assert_eq!(select_preferred_voice(&voices).unwrap().voice_uri, "b");
    }

    #[test]
    fn test_falls_back_to_first_voice() {
        let voices = vec![voice("a", "Thomas", "fr-FR", true)];
        assert_eq!(select_preferred_voice(&voices).unwrap().voice_uri, "a");
    }

    #[test]
    fn test_no_voices() {
        assert!(select_preferred_voice(&[]).is_none());
    }
}
