use anyhow::{Context, Result, ensure};
use async_trait::async_trait;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use dexcatch_game::CatalogSource;

use super::{CombinedScenario, LiveCtx, LiveScenario, TestScenario};

/// Fetches a handful of seeded creatures and their species straight from the
/// catalog, checking that each decodes into something playable.
pub struct LiveSmokeScenario {
    samples: usize,
}

impl Default for LiveSmokeScenario {
    fn default() -> Self {
        Self { samples: 3 }
    }
}

#[async_trait(?Send)]
impl LiveScenario for LiveSmokeScenario {
    async fn run_live(&self, ctx: &LiveCtx<'_>) -> Result<()> {
        let catalog_size = ctx.tester.config().catalog_size.max(1);
        let mut rng = ChaCha20Rng::seed_from_u64(ctx.seed);
        for _ in 0..self.samples {
            let id = rng.gen_range(1..=catalog_size);
            let entry = ctx
                .catalog
                .creature(id)
                .await
                .with_context(|| format!("fetching creature #{id} from {}", ctx.catalog.base()))?;
            ensure!(entry.id == id, "asked for #{id}, got #{}", entry.id);
            ensure!(!entry.name.is_empty(), "creature #{id} has no name");
            ensure!(!entry.type_names().is_empty(), "creature #{id} has no types");
            let species = ctx
                .catalog
                .species(&entry)
                .await
                .with_context(|| format!("fetching species for #{id}"))?;
            if ctx.verbose {
                println!(
                    "  🌐 #{id} {} types={:?} legendary={}",
                    entry.name,
                    entry.type_names(),
                    species.is_legendary
                );
            }
        }
        Ok(())
    }
}

impl CombinedScenario for LiveSmokeScenario {
    fn as_logic_scenario(&self) -> Option<TestScenario> {
        None
    }
}

