//! Legacy surface of `FarmAnimal`.

use crate::{
    facades::{FacadeType, RewriteFacade},
    host::{
        world::{farm_animal_definition, farm_animal_type, farm_type, Farm, FarmAnimal, COOP_HOUSE},
        HostMethod, HostType, HostValue,
    },
    Error, Result,
};

/// Maps removed `FarmAnimal` methods to the current animal API.
///
/// - `isCoopDweller()` is derived from the animal's data, which now records the house type.
/// - `warpHome(Farm, FarmAnimal)` lost both parameters; the animal warps itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FarmAnimalFacade {
    base: FarmAnimal,
}

impl FarmAnimalFacade {
    /// Legacy `isCoopDweller()`.
    #[must_use]
    pub fn is_coop_dweller(&self) -> bool {
        is_coop_dweller(&self.base)
    }

    /// Legacy `warpHome(Farm, FarmAnimal)`. Both arguments are ignored.
    pub fn warp_home(&mut self, _farm: &Farm, _animal: &FarmAnimal) {
        self.base.warp_home();
    }
}

fn is_coop_dweller(animal: &FarmAnimal) -> bool {
    animal.get_animal_data().is_some_and(|data| data.house == COOP_HOUSE)
}

impl RewriteFacade for FarmAnimalFacade {
    type Base = FarmAnimal;

    const NAME: &'static str = "FarmAnimalFacade";

    fn from_base(base: FarmAnimal) -> Self {
        FarmAnimalFacade { base }
    }

    fn base(&self) -> &FarmAnimal {
        &self.base
    }

    fn base_mut(&mut self) -> &mut FarmAnimal {
        &mut self.base
    }

    fn into_base(self) -> FarmAnimal {
        self.base
    }

    fn construct_base(args: &[HostValue]) -> Result<FarmAnimal> {
        match args {
            [] => Ok(FarmAnimal::default()),
            [HostValue::String(kind), HostValue::Int64(_), HostValue::Int64(_)] => Ok(FarmAnimal::new(kind, None)),
            _ => Err(Error::FacadeMismatch(format!(
                "no FarmAnimal constructor accepts {} arguments of these kinds",
                args.len()
            ))),
        }
    }

    fn facade_type() -> FacadeType {
        FacadeType::new::<Self>(&farm_animal_definition())
            .member(HostMethod::new("isCoopDweller", HostType::boolean()), |receiver, _| {
                Ok(Some(HostValue::Boolean(is_coop_dweller(Self::base_of(receiver)?))))
            })
            .member(
                HostMethod::new("warpHome", HostType::void())
                    .param("f", farm_type())
                    .param("a", farm_animal_type()),
                |receiver, _| {
                    Self::base_of(receiver)?.warp_home();
                    Ok(None)
                },
            )
    }
}
