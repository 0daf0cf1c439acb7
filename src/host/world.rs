//! The current host game objects the shipped facades adapt, and their API description.
//!
//! [`WorldDate`], [`FarmAnimal`] and [`Farm`] model the current member surface of the host
//! types in process. [`game_api`] registers the matching link-level descriptions so the
//! matcher can tell which compiled references still resolve.

use strum::{Display, EnumIter, EnumString};

use crate::host::{HostApi, HostField, HostMethod, HostType, HostTypeDef};

/// Assembly name of the host game.
pub const GAME_ASSEMBLY: &str = "Stardew Valley";

/// Namespace of the host game's core types.
pub const GAME_NAMESPACE: &str = "StardewValley";

/// Housing value of animals living in a coop.
pub const COOP_HOUSE: &str = "Coop";

/// A season of the in-game calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Season {
    /// Spring
    Spring,
    /// Summer
    Summer,
    /// Fall
    Fall,
    /// Winter
    Winter,
}

/// An in-game calendar date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldDate {
    year: i32,
    season_key: String,
    day_of_month: i32,
}

impl Default for WorldDate {
    fn default() -> Self {
        WorldDate {
            year: 1,
            season_key: Season::Spring.to_string(),
            day_of_month: 1,
        }
    }
}

impl WorldDate {
    /// Creates a date from a season key such as `"summer"`.
    #[must_use]
    pub fn new(year: i32, season_key: &str, day_of_month: i32) -> Self {
        WorldDate {
            year,
            season_key: season_key.to_string(),
            day_of_month,
        }
    }

    /// The season as its string key.
    #[must_use]
    pub fn season_key(&self) -> &str {
        &self.season_key
    }

    /// Sets the season by string key.
    pub fn set_season_key(&mut self, key: &str) {
        self.season_key = key.to_string();
    }

    /// The season as an enum, if the key names a known season.
    #[must_use]
    pub fn season(&self) -> Option<Season> {
        self.season_key.parse().ok()
    }

    /// Sets the season from the enum.
    pub fn set_season(&mut self, season: Season) {
        self.season_key = season.to_string();
    }

    /// Calendar year, starting at 1.
    #[must_use]
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Day of the month, 1 to 28.
    #[must_use]
    pub fn day_of_month(&self) -> i32 {
        self.day_of_month
    }
}

/// Static data describing a farm animal type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FarmAnimalData {
    /// The building type the animal lives in (`"Coop"`, `"Barn"`)
    pub house: String,
}

/// A farm animal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FarmAnimal {
    /// Display name
    pub name: String,
    data: Option<FarmAnimalData>,
    /// Name of the animal's home building
    pub home: Option<String>,
    /// Name of the location the animal is currently in
    pub location: Option<String>,
}

impl FarmAnimal {
    /// Creates an animal living in the given house type.
    #[must_use]
    pub fn new(name: &str, house: Option<&str>) -> Self {
        FarmAnimal {
            name: name.to_string(),
            data: house.map(|house| FarmAnimalData {
                house: house.to_string(),
            }),
            home: None,
            location: None,
        }
    }

    /// The animal's type data, if its type is known.
    #[must_use]
    pub fn get_animal_data(&self) -> Option<&FarmAnimalData> {
        self.data.as_ref()
    }

    /// Moves the animal back into its home building.
    pub fn warp_home(&mut self) {
        self.location.clone_from(&self.home);
    }
}

/// The player's farm.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Farm {
    /// Location name
    pub name: String,
}

fn game_type(name: &str) -> HostType {
    HostType::named(GAME_NAMESPACE, name).in_assembly(GAME_ASSEMBLY)
}

/// `StardewValley.WorldDate`
#[must_use]
pub fn world_date_type() -> HostType {
    game_type("WorldDate")
}

/// `StardewValley.FarmAnimal`
#[must_use]
pub fn farm_animal_type() -> HostType {
    game_type("FarmAnimal")
}

/// `StardewValley.Farm`
#[must_use]
pub fn farm_type() -> HostType {
    game_type("Farm")
}

/// `StardewValley.Season`
#[must_use]
pub fn season_type() -> HostType {
    game_type("Season")
}

/// `StardewValley.GameData.FarmAnimals.FarmAnimalData`
#[must_use]
pub fn farm_animal_data_type() -> HostType {
    HostType::named("StardewValley.GameData.FarmAnimals", "FarmAnimalData").in_assembly("StardewValley.GameData")
}

/// The link-level description of the current `WorldDate`.
#[must_use]
pub fn world_date_definition() -> HostTypeDef {
    HostTypeDef::new(world_date_type())
        .extends(HostType::object())
        .constructor(HostMethod::constructor())
        .constructor(
            HostMethod::constructor()
                .param("year", HostType::int32())
                .param("season", HostType::string())
                .param("dayOfMonth", HostType::int32()),
        )
        .constructor(
            HostMethod::constructor()
                .param("year", HostType::int32())
                .param("season", season_type())
                .param("dayOfMonth", HostType::int32()),
        )
        .property("Year", HostType::int32(), true, true)
        .property("SeasonKey", HostType::string(), true, true)
        .property("Season", season_type(), true, true)
        .property("DayOfMonth", HostType::int32(), true, true)
        .property("TotalDays", HostType::int32(), true, true)
}

/// `StardewValley.Character`
#[must_use]
pub fn character_type() -> HostType {
    game_type("Character")
}

/// The link-level description of `Character`, the base of every NPC and animal.
#[must_use]
pub fn character_definition() -> HostTypeDef {
    HostTypeDef::new(character_type())
        .extends(HostType::object())
        .constructor(HostMethod::constructor())
        .property("Name", HostType::string(), true, true)
        .method(HostMethod::new("getTileX", HostType::int32()))
        .method(HostMethod::new("getTileY", HostType::int32()))
}

/// The link-level description of the current `FarmAnimal`.
#[must_use]
pub fn farm_animal_definition() -> HostTypeDef {
    HostTypeDef::new(farm_animal_type())
        .extends(character_type())
        .constructor(HostMethod::constructor())
        .constructor(
            HostMethod::constructor()
                .param("type", HostType::string())
                .param("id", HostType::int64())
                .param("ownerID", HostType::int64()),
        )
        .method(HostMethod::new("GetAnimalData", farm_animal_data_type()))
        .method(HostMethod::new("warpHome", HostType::void()))
        .method(HostMethod::new("isMale", HostType::boolean()))
        .field(HostField::new("myID", game_type("NetLong")))
}

/// The link-level description of the current `Farm`.
#[must_use]
pub fn farm_definition() -> HostTypeDef {
    HostTypeDef::new(farm_type())
        .extends(game_type("BuildableGameLocation"))
        .constructor(HostMethod::constructor())
        .constructor(
            HostMethod::constructor()
                .param("mapPath", HostType::string())
                .param("name", HostType::string()),
        )
}

/// Builds a host API table holding the game types the shipped facades adapt.
#[must_use]
pub fn game_api() -> HostApi {
    let api = HostApi::new();
    api.register(world_date_definition());
    api.register(character_definition());
    api.register(farm_animal_definition());
    api.register(farm_definition());
    api.register(HostTypeDef::new(season_type()));
    api.register(HostTypeDef::new(farm_animal_data_type()).field(HostField::new("House", HostType::string())));
    api
}
