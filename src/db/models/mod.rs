mod article;
mod assignment;
mod certificate;
mod course;
mod enrollment;
mod quiz;
mod user;
mod webinar;

#[allow(unused)]
pub use article::*;
#[allow(unused)]
pub use assignment::*;
#[allow(unused)]
pub use certificate::*;
#[allow(unused)]
pub use course::*;
#[allow(unused)]
pub use enrollment::*;
#[allow(unused)]
pub use quiz::*;
#[allow(unused)]
pub use user::*;
#[allow(unused)]
pub use webinar::*;

use uuid::Uuid;

/// URL-safe slug computed from a title at construction time.
pub fn slugify_title(title: &str) -> String {
    slug::slugify(title)
}

/// Variant of a slug used when the plain one is already taken.
pub fn dedupe_slug(base: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", base, &suffix[..8])
}

/// Splits a comma-separated tags column into trimmed, non-empty tags.
pub fn tags_list(tags: &str) -> Vec<String> {
    tags.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_title_normalizes() {
        assert_eq!(slugify_title("Intro to Rust!"), "intro-to-rust");
        assert_eq!(slugify_title("  Async / Await  "), "async-await");
    }

    #[test]
    fn dedupe_slug_appends_short_suffix() {
        let first = dedupe_slug("intro-to-rust");
        let second = dedupe_slug("intro-to-rust");
        assert!(first.starts_with("intro-to-rust-"));
        assert_eq!(first.len(), "intro-to-rust-".len() + 8);
        assert_ne!(first, second);
    }

    #[test]
    fn tags_list_trims_and_drops_empties() {
        assert_eq!(tags_list("rust, web , ,api"), vec!["rust", "web", "api"]);
        assert!(tags_list("").is_empty());
        assert!(tags_list(" , ").is_empty());
    }
}
