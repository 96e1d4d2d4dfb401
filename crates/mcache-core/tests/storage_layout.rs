//! # Storage Layout
//!
//! Physical file names must stay stable: tooling outside this workspace
//! reads the media directory directly.

use mcache_core::{sha256_digest, CacheTag, Encoding, Identity, MediaError, MediaType};

fn identity(media_type: MediaType) -> Identity {
    Identity::new(sha256_digest(b"layout fixture"), media_type)
}

#[test]
fn names_follow_the_fixed_layout() {
    let png = identity(MediaType::Png);
    let hash = png.digest.to_hex();

    assert_eq!(png.file_name(&CacheTag::primary()), format!("{hash}.png"));
    assert_eq!(
        png.file_name(&CacheTag::format(MediaType::Webp)),
        format!("{hash}.png.webp")
    );
    assert_eq!(
        png.file_name(&CacheTag::format(MediaType::Png)),
        format!("{hash}.png.png")
    );
    assert_eq!(
        png.file_name(&CacheTag::encoded(Encoding::Gzip)),
        format!("{hash}.png.gz")
    );

    let svg = identity(MediaType::Svg);
    assert_eq!(
        svg.file_name(&CacheTag::format(MediaType::Svg).with_encoding(Encoding::Brotli)),
        format!("{hash}.svg.svg.br")
    );
}

#[test]
fn public_name_parses_back_to_the_identity() {
    let jpg = identity(MediaType::Jpg);
    let name = jpg.to_string();
    assert!(name.ends_with(".jpg"));
    assert_eq!(name.parse::<Identity>().unwrap(), jpg);
}

#[test]
fn variant_file_names_are_not_identities() {
    let name = identity(MediaType::Png).file_name(&CacheTag::format(MediaType::Webp));
    assert!(matches!(
        name.parse::<Identity>(),
        Err(MediaError::InvalidIdentity(_))
    ));
    assert!("../etc/passwd".parse::<Identity>().is_err());
    assert!("abc.png".parse::<Identity>().is_err());
}

#[test]
fn only_canonical_names_are_identities() {
    let hash = sha256_digest(b"alias").to_hex();
    for name in [
        format!("{hash}.jpeg"),
        format!("{hash}.JPG"),
        format!("{hash}.PNG"),
        format!("{}.png", hash.to_uppercase()),
        format!(" {hash}.png"),
    ] {
        assert!(
            matches!(name.parse::<Identity>(), Err(MediaError::InvalidIdentity(_))),
            "{name}"
        );
    }
    assert!(format!("{hash}.jpg").parse::<Identity>().is_ok());
}

#[test]
fn identical_content_yields_identical_identity() {
    let a = Identity::new(sha256_digest(b"same bytes"), MediaType::Gif);
    let b = Identity::new(sha256_digest(b"same bytes"), MediaType::Gif);
    let c = Identity::new(sha256_digest(b"other bytes"), MediaType::Gif);
    assert_eq!(a, b);
    assert_ne!(a, c);
}
