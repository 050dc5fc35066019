use rand::seq::IndexedRandom;

use super::types::Avatar;

const AVATAR_NAMES: &[&str] = &[
    "Axolotl", "Badger", "Capybara", "Dingo", "Echidna", "Ferret", "Gecko", "Heron", "Ibis", "Jackal", "Koala",
    "Lemur", "Marmot", "Narwhal", "Ocelot", "Pangolin", "Quokka", "Raccoon", "Stoat", "Tapir", "Walrus", "Yak",
];

pub trait AvatarPicker: Send + Sync {
    fn pick(&self) -> Avatar;
}

pub struct ThreadRngAvatarPicker;

impl AvatarPicker for ThreadRngAvatarPicker {
    fn pick(&self) -> Avatar {
        let name = AVATAR_NAMES.choose(&mut rand::rng()).copied().unwrap_or(AVATAR_NAMES[0]);
        avatar(name)
    }
}

pub fn avatar(name: &str) -> Avatar {
    Avatar {
        name: name.to_string(),
        url: format!("/static/avatars/{}.png", name.to_lowercase()),
    }
}
