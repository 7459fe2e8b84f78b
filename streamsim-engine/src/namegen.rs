//! Synthetic names for generated entities

use rand::distr::Alphanumeric;
use rand::seq::IndexedRandom;
use rand::Rng;

const NOUNS: &[&str] = &[
    "River", "Stone", "Engine", "Garden", "Mirror", "Signal", "Harbor", "Shadow", "Comet", "Lantern",
    "Forest", "Velvet", "Circuit", "Wolf", "Tide", "Ember", "Glacier", "Orchid", "Canyon", "Echo",
    "Satellite", "Thunder", "Raven", "Meadow", "Crystal", "Desert", "Horizon", "Marble", "Falcon", "Static",
];

const ADJECTIVES: &[&str] = &[
    "Silent", "Electric", "Golden", "Broken", "Hollow", "Crimson", "Distant", "Wild", "Neon", "Quiet",
    "Restless", "Frozen", "Burning", "Lonely", "Bright", "Velvet", "Endless", "Lucky", "Savage", "Gentle",
];

const VERBS: &[&str] = &[
    "Running", "Falling", "Dancing", "Waiting", "Drifting", "Breaking", "Shining", "Hiding", "Calling", "Turning",
];

const GENRE_ROOTS: &[&str] = &[
    "rock", "pop", "jazz", "folk", "soul", "funk", "wave", "core", "house", "techno", "blues", "metal",
    "ambient", "disco", "punk", "grunge", "trance", "swing", "dub", "step",
];

const GENRE_PREFIXES: &[&str] = &[
    "neo", "post", "dark", "synth", "acid", "deep", "lo-fi", "prog", "indie", "dream", "math", "space",
];

const FIRST_NAMES: &[&str] = &[
    "Anna", "Lars", "Maria", "Jonas", "Sofia", "Mateo", "Emma", "Noah", "Ingrid", "Luca", "Amara", "Kenji",
    "Olivia", "Ivan", "Leila", "Tomas", "Chloe", "Arjun", "Freya", "Diego", "Hana", "Oskar", "Nadia", "Elias",
];

const LAST_NAMES: &[&str] = &[
    "Berg", "Novak", "Silva", "Tanaka", "Moreau", "Kowalski", "Hansen", "Rossi", "Okafor", "Larsen", "Jensen",
    "Fischer", "Nguyen", "Costa", "Petrov", "Lindqvist", "Murphy", "Schmidt", "Haddad", "Ortega",
];

const MAIL_DOMAINS: &[&str] = &["example.com", "example.org", "example.net", "mail.example"];

fn pick<R: Rng + ?Sized>(rng: &mut R, words: &'static [&'static str]) -> &'static str {
    words.choose(rng).copied().unwrap_or_default()
}

fn maybe_article<R: Rng + ?Sized>(rng: &mut R, name: String, p: f64) -> String {
    if rng.random_bool(p) {
        format!("The {}", name)
    } else {
        name
    }
}

fn band_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    let core = if rng.random_bool(0.5) {
        format!("{}s", pick(rng, NOUNS))
    } else {
        format!("{} {}s", pick(rng, ADJECTIVES), pick(rng, NOUNS))
    };
    let name = maybe_article(rng, core, 0.7);
    if rng.random_bool(0.2) {
        let link = if rng.random_bool(0.25) { "of" } else { "and" };
        format!("{} {} the {}s", name, link, pick(rng, NOUNS))
    } else {
        name
    }
}

pub fn first_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    pick(rng, FIRST_NAMES).to_string()
}

pub fn last_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    pick(rng, LAST_NAMES).to_string()
}

/// Mostly bands, sometimes a solo performer
pub fn artist_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    if rng.random_bool(0.8) {
        band_name(rng)
    } else {
        format!("{} {}", first_name(rng), last_name(rng))
    }
}

/// A fresh genre name, or one derived from `base`
pub fn genre_name<R: Rng + ?Sized>(rng: &mut R, base: Option<&str>) -> String {
    match base {
        Some(base) => format!("{}-{}", pick(rng, GENRE_PREFIXES), base),
        None if rng.random_bool(0.5) => pick(rng, GENRE_ROOTS).to_string(),
        None => format!("{} {}", pick(rng, GENRE_PREFIXES), pick(rng, GENRE_ROOTS)),
    }
}

pub fn collection_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    match rng.random_range(0..3) {
        0 => pick(rng, NOUNS).to_string(),
        1 => format!("{} {}", pick(rng, ADJECTIVES), pick(rng, NOUNS)),
        _ => {
            let name = format!("{} {}", pick(rng, VERBS), pick(rng, NOUNS));
            maybe_article(rng, name, 0.3)
        }
    }
}

pub fn track_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    let roll: f64 = rng.random();
    if roll < 0.6 {
        pick(rng, NOUNS).to_string()
    } else if roll < 0.75 {
        band_name(rng)
    } else {
        format!("{} {} {}", pick(rng, VERBS), pick(rng, ADJECTIVES), pick(rng, NOUNS)).to_lowercase()
    }
}

/// An address that is unique with overwhelming probability
pub fn email<R: Rng + ?Sized>(rng: &mut R, first: &str, last: &str) -> String {
    format!(
        "{}.{}.{:08x}@{}",
        first.to_lowercase(),
        last.to_lowercase(),
        rng.random::<u32>(),
        pick(rng, MAIL_DOMAINS)
    )
}

pub fn password<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..16).map(|_| char::from(rng.sample(Alphanumeric))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_names_are_not_empty() {
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..200 {
            assert!(!artist_name(&mut rng).is_empty());
            assert!(!collection_name(&mut rng).is_empty());
            assert!(!track_name(&mut rng).is_empty());
            assert!(!genre_name(&mut rng, None).is_empty());
        }
    }

    #[test]
    fn test_collection_names_cover_every_shape() {
        let mut rng = StdRng::seed_from_u64(23);
        let names: Vec<String> = (0..500).map(|_| collection_name(&mut rng)).collect();

        let starts_with_verb = |name: &str| VERBS.iter().any(|verb| name.starts_with(verb));
        assert!(names.iter().any(|n| n.starts_with("The ")));
        assert!(names.iter().any(|n| starts_with_verb(n)));
        assert!(names.iter().any(|n| !n.contains(' ')));
    }

    #[test]
    fn test_derived_genre_keeps_base() {
        let mut rng = StdRng::seed_from_u64(4);
        let derived = genre_name(&mut rng, Some("swing"));
        assert!(derived.ends_with("-swing"), "{}", derived);
    }

    #[test]
    fn test_email_and_password_shape() {
        let mut rng = StdRng::seed_from_u64(8);
        let email = email(&mut rng, "Anna", "Berg");
        assert!(email.starts_with("anna.berg."));
        assert!(email.contains('@'));

        let password = password(&mut rng);
        assert_eq!(password.len(), 16);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
