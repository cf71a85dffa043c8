use crate::commands::{open_pool, CommandResult};
use sparky_core::config::{AppConfig, LoadOptions};
use sparky_db::{migrations, DemoSeedDataset, DEMO_LEADS};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool =
            open_pool(&config).await.map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let seed_result = DemoSeedDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = DemoSeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let run_result = if verification.all_present {
            Ok(seed_result.leads_seeded)
        } else {
            let failed = verification
                .checks
                .iter()
                .filter_map(|(check, passed)| (!passed).then_some(*check))
                .collect::<Vec<_>>();
            Err(("seed_verification", verification_message(&failed), 6u8))
        };

        pool.close().await;
        run_result
    });

    match result {
        Ok(lead_ids) => CommandResult::success("seed", seed_summary(&lead_ids)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn seed_summary(lead_ids: &[&'static str]) -> String {
    let lines = DEMO_LEADS
        .iter()
        .filter(|seed| lead_ids.contains(&seed.id))
        .map(|seed| format!("  - {}: {} ({})", seed.status, seed.id, seed.name))
        .collect::<Vec<_>>();
    format!("demo leads loaded:\n{}", lines.join("\n"))
}

fn verification_message(failed: &[&str]) -> String {
    if failed.is_empty() {
        "Some demo leads failed to load".to_string()
    } else {
        format!("Seed verification failed for leads: {}", failed.join(", "))
    }
}
