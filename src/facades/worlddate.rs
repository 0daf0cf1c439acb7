//! Legacy surface of `WorldDate`: `Season` was a string property before it became an enum.

use crate::{
    facades::{facade::string_arg, FacadeType, RewriteFacade},
    host::{
        world::{world_date_definition, WorldDate},
        HostMethod, HostType, HostValue,
    },
    Error, Result,
};

/// Maps the older `WorldDate.Season` string property onto the current `SeasonKey`.
///
/// The value passes through unchanged in both directions.
///
/// # Examples
///
/// ```rust
/// use cilcompat::facades::{RewriteFacade, WorldDateFacade};
/// use cilcompat::host::world::WorldDate;
///
/// let mut date = WorldDateFacade::from_base(WorldDate::new(1, "summer", 3));
/// assert_eq!(date.season(), "summer");
///
/// date.set_season("fall");
/// assert_eq!(date.base().season_key(), "fall");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldDateFacade {
    base: WorldDate,
}

impl WorldDateFacade {
    /// Legacy `Season` getter.
    #[must_use]
    pub fn season(&self) -> &str {
        self.base.season_key()
    }

    /// Legacy `Season` setter.
    pub fn set_season(&mut self, value: &str) {
        self.base.set_season_key(value);
    }
}

impl RewriteFacade for WorldDateFacade {
    type Base = WorldDate;

    const NAME: &'static str = "WorldDateFacade";

    fn from_base(base: WorldDate) -> Self {
        WorldDateFacade { base }
    }

    fn base(&self) -> &WorldDate {
        &self.base
    }

    fn base_mut(&mut self) -> &mut WorldDate {
        &mut self.base
    }

    fn into_base(self) -> WorldDate {
        self.base
    }

    fn construct_base(args: &[HostValue]) -> Result<WorldDate> {
        match args {
            [] => Ok(WorldDate::default()),
            [HostValue::Int32(year), HostValue::String(season), HostValue::Int32(day)] => {
                Ok(WorldDate::new(*year, season, *day))
            }
            _ => Err(Error::FacadeMismatch(format!(
                "no WorldDate constructor accepts {} arguments of these kinds",
                args.len()
            ))),
        }
    }

    fn facade_type() -> FacadeType {
        FacadeType::new::<Self>(&world_date_definition())
            .member(HostMethod::new("get_Season", HostType::string()), |receiver, _| {
                let date = Self::base_of(receiver)?;
                Ok(Some(HostValue::from(date.season_key())))
            })
            .member(
                HostMethod::new("set_Season", HostType::void()).param("value", HostType::string()),
                |receiver, args| {
                    let value = string_arg(args, 0, "set_Season")?;
                    Self::base_of(receiver)?.set_season_key(value);
                    Ok(None)
                },
            )
    }
}
