//! The Project Regeneration Nexus solutions offered as FAQ sources.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FaqError;

/// Base URL of the Nexus solution pages.
pub const NEXUS_BASE_URL: &str = "https://regeneration.org/nexus/";

macro_rules! nexus_solutions {
    ($($variant:ident => $slug:literal,)+) => {
        /// A solution page of the Project Regeneration Nexus.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum NexusSolution {
            $(
                #[serde(rename = $slug)]
                $variant,
            )+
        }

        impl NexusSolution {
            /// Every solution, in catalog order.
            pub const ALL: &'static [NexusSolution] = &[$(NexusSolution::$variant,)+];

            /// The URL path segment of the solution, e.g. `azolla-fern`.
            pub fn slug(&self) -> &'static str {
                match self {
                    $(NexusSolution::$variant => $slug,)+
                }
            }
        }
    };
}

nexus_solutions! {
    Afforestation => "afforestation",
    Agroecology => "agroecology",
    Agroforestry => "agroforestry",
    Asparagopsis => "asparagopsis",
    AzollaFern => "azolla-fern",
    Bamboo => "bamboo",
    Beavers => "beavers",
    Biochar => "biochar",
    Buildings => "buildings",
    CleanCookstoves => "clean-cookstoves",
    Compost => "compost",
    DegradedLandRestoration => "degraded-land-restoration",
    EatingPlants => "eating-plants",
    EducationGirls => "education-girls",
    ElectricVehicles => "electric-vehicles",
    ElectrifyEverything => "electrify-everything",
    EnergyStorage => "energy-storage",
    FifteenMinuteCity => "fifteen-minute-city",
    FireEcology => "fire-ecology",
    Grasslands => "grasslands",
    HeatPumps => "heat-pumps",
    Mangroves => "mangroves",
    MarineProtectedAreas => "marine-protected-areas",
    Micromobility => "micromobility",
    NatureOfCities => "nature-of-cities",
    NetZeroCities => "net-zero-cities",
    Offsets => "offsets",
    OceanFarming => "ocean-farming",
    RegenerativeAgriculture => "regenerative-agriculture",
    Seaforestation => "seaforestation",
    Seagrasses => "seagrasses",
    Silvopasture => "silvopasture",
    SmartMicrogrids => "smart-microgrids",
    Solar => "solar",
    TidalSaltMarshes => "tidal-salt-marshes",
    TropicalForests => "tropical-forests",
    UrbanFarming => "urban-farming",
    UrbanMobility => "urban-mobility",
    Wetlands => "wetlands",
    Wind => "wind",
}

impl NexusSolution {
    /// The page URL under `base`, which should end with a slash.
    pub fn url(&self, base: &str) -> String {
        format!("{base}{}", self.slug())
    }

    /// The solution name in words, e.g. `azolla fern`.
    pub fn title(&self) -> String {
        self.slug().replace('-', " ")
    }
}

impl fmt::Display for NexusSolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for NexusSolution {
    type Err = FaqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_start_matches("/nexus/").to_lowercase().replace([' ', '_'], "-");
        NexusSolution::ALL
            .iter()
            .copied()
            .find(|solution| solution.slug() == wanted)
            .ok_or_else(|| FaqError::InvalidArgument(format!("unknown Nexus solution '{s}'")))
    }
}
