use crate::error::{Error, Result};
use crate::vitals::VitalKind;
use serde::{Deserialize, Serialize};

const BUNDLED_CATALOG: &str = include_str!("../assets/planets.json");

/// Procedural look of a planet; stands in for an image asset.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct PlanetImage {
    pub(crate) base: [u8; 3],
    pub(crate) accent: [u8; 3],
    pub(crate) ocean: [u8; 3],
    pub(crate) atmosphere: [u8; 3],
    #[serde(default)]
    pub(crate) rings: bool,
    pub(crate) seed: u32,
    pub(crate) roughness: f32,
    pub(crate) bands: f32,
    pub(crate) clouds: f32,
    #[serde(default)]
    pub(crate) ice: f32,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct DefaultStats {
    pub(crate) stability: f32,
    pub(crate) energy: f32,
    pub(crate) strength: f32,
}

impl DefaultStats {
    pub(crate) fn get(&self, kind: VitalKind) -> f32 {
        match kind {
            VitalKind::Stability => self.stability,
            VitalKind::Energy => self.energy,
            VitalKind::Strength => self.strength,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct Pet {
    pub(crate) name: String,
    pub(crate) image: PlanetImage,
    pub(crate) description: String,
    pub(crate) default_stats: DefaultStats,
    #[serde(default)]
    pub(crate) intro: Vec<String>,
}

/// What gets persisted under `adoptedPet`: the catalog entry without its
/// narration, plus where it sits in the catalog.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct AdoptedPet {
    pub(crate) id: usize,
    pub(crate) name: String,
    pub(crate) image: PlanetImage,
    pub(crate) description: String,
    pub(crate) default_stats: DefaultStats,
}

impl AdoptedPet {
    pub(crate) fn from_catalog(id: usize, pet: &Pet) -> Self {
        Self {
            id,
            name: pet.name.clone(),
            image: pet.image,
            description: pet.description.clone(),
            default_stats: pet.default_stats,
        }
    }
}

pub(crate) fn parse(json: &str) -> Result<Vec<Pet>> {
    let pets: Vec<Pet> = serde_json::from_str(json).map_err(Error::Catalog)?;
    if pets.is_empty() {
        return Err(Error::EmptyCatalog);
    }
    Ok(pets)
}

pub(crate) fn bundled() -> Result<Vec<Pet>> {
    parse(BUNDLED_CATALOG)
}
