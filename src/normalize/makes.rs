//! Known vehicle makes
//!
//! Used to split listing titles into make, model and variant, and by the
//! query builder to resolve a search's free-text make.

/// (alias, canonical display name); aliases are lowercase, single-spaced
const MAKES: &[(&str, &str)] = &[
    ("abarth", "Abarth"),
    ("alfa romeo", "Alfa Romeo"),
    ("alfa", "Alfa Romeo"),
    ("aston martin", "Aston Martin"),
    ("audi", "Audi"),
    ("bentley", "Bentley"),
    ("bmw", "BMW"),
    ("byd", "BYD"),
    ("citroen", "Citroen"),
    ("citroën", "Citroen"),
    ("cupra", "Cupra"),
    ("dacia", "Dacia"),
    ("ds", "DS"),
    ("ferrari", "Ferrari"),
    ("fiat", "Fiat"),
    ("ford", "Ford"),
    ("honda", "Honda"),
    ("hyundai", "Hyundai"),
    ("jaguar", "Jaguar"),
    ("jeep", "Jeep"),
    ("kia", "Kia"),
    ("lamborghini", "Lamborghini"),
    ("land rover", "Land Rover"),
    ("lexus", "Lexus"),
    ("maserati", "Maserati"),
    ("mazda", "Mazda"),
    ("mercedes-benz", "Mercedes-Benz"),
    ("mercedes benz", "Mercedes-Benz"),
    ("mercedes", "Mercedes-Benz"),
    ("mini", "MINI"),
    ("mitsubishi", "Mitsubishi"),
    ("nissan", "Nissan"),
    ("opel", "Opel"),
    ("peugeot", "Peugeot"),
    ("polestar", "Polestar"),
    ("porsche", "Porsche"),
    ("renault", "Renault"),
    ("seat", "Seat"),
    ("skoda", "Skoda"),
    ("škoda", "Skoda"),
    ("smart", "smart"),
    ("subaru", "Subaru"),
    ("suzuki", "Suzuki"),
    ("tesla", "Tesla"),
    ("toyota", "Toyota"),
    ("volkswagen", "Volkswagen"),
    ("vw", "Volkswagen"),
    ("volvo", "Volvo"),
];

/// Resolves free text to a canonical make name
pub fn canonical_make(text: &str) -> Option<&'static str> {
    let key = text
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    MAKES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, name)| *name)
}

/// Title split into its leading make and the remainder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleParts {
    pub make: Option<&'static str>,
    pub model: Option<String>,
    pub variant: Option<String>,
}

/// Splits "Make Model Variant..." using the longest known make prefix
///
/// Without a known make nothing is split.
pub fn split_title(title: &str) -> TitleParts {
    let words: Vec<&str> = title.split_whitespace().collect();
    let lowered: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();

    let mut best: Option<(usize, &'static str)> = None;
    for (alias, name) in MAKES {
        let alias_words: Vec<&str> = alias.split(' ').collect();
        let matches = alias_words.len() <= lowered.len()
            && alias_words
                .iter()
                .zip(&lowered)
                .all(|(alias_word, word)| *alias_word == word.as_str());
        if matches && best.map_or(true, |(len, _)| alias_words.len() > len) {
            best = Some((alias_words.len(), *name));
        }
    }

    let Some((consumed, make)) = best else {
        return TitleParts {
            make: None,
            model: None,
            variant: None,
        };
    };

    let rest = &words[consumed..];
    TitleParts {
        make: Some(make),
        model: rest.first().map(|model| model.to_string()),
        variant: (rest.len() > 1).then(|| rest[1..].join(" ")),
    }
}
