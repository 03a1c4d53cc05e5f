//! Deploy and inspect a synthpool instance.

use odra::host::{Deployer, HostEnv};
use odra::prelude::Addressable;

use odra_cli::{
    deploy::DeployScript,
    scenario::{Args, Error, Scenario, ScenarioMetadata},
    CommandArg, ContractProvider, DeployedContractsContainer, DeployerExt, OdraCli,
};

use synthpool::{
    oracle::{PriceOracle, PriceOracleInitArgs},
    processor::{SynthCore, SynthCoreInitArgs},
    token::{SyntheticToken, SyntheticTokenInitArgs},
};

const DEPLOY_GAS: u64 = 350_000_000_000;
const CALL_GAS: u64 = 10_000_000_000;
/// Price entries older than an hour are refused.
const ORACLE_MAX_AGE_MS: u64 = 60 * 60 * 1000;

/// Deploys the stable synthetic, the oracle, a base reserve token and the core,
/// then hands minting rights of the stable synthetic to the core.
pub struct SynthPoolDeployScript;

impl DeployScript for SynthPoolDeployScript {
    fn deploy(
        &self,
        env: &HostEnv,
        container: &mut DeployedContractsContainer,
    ) -> Result<(), odra_cli::deploy::Error> {
        let deployer = env.caller();

        let mut stable = SyntheticToken::load_or_deploy(
            env,
            SyntheticTokenInitArgs {
                name: "Synthetic USD".to_string(),
                symbol: "xUSD".to_string(),
                decimals: 6,
                minter: deployer,
            },
            container,
            DEPLOY_GAS,
        )?;
        println!("stable synthetic at {:?}", stable.address());

        let oracle = PriceOracle::load_or_deploy(
            env,
            PriceOracleInitArgs {
                admin: deployer,
                anchor: stable.address().clone(),
                max_age_ms: ORACLE_MAX_AGE_MS,
            },
            container,
            DEPLOY_GAS,
        )?;
        println!("oracle at {:?}", oracle.address());

        env.set_gas(DEPLOY_GAS);
        let base = SyntheticToken::deploy(
            env,
            SyntheticTokenInitArgs {
                name: "Test USD Coin".to_string(),
                symbol: "tUSDC".to_string(),
                decimals: 6,
                minter: deployer,
            },
        );
        println!("base reserve token at {:?}", base.address());

        let core = SynthCore::load_or_deploy(
            env,
            SynthCoreInitArgs {
                base_asset: base.address().clone(),
                admin: deployer,
                oracle: oracle.address().clone(),
                swap_fee_bps: 4,
                synthetic_swap_fee_bps: 30,
                flash_fee_bps: 9,
                stable_asset: stable.address().clone(),
            },
            container,
            DEPLOY_GAS,
        )?;
        println!("core at {:?}", core.address());

        if stable.minter() != Some(core.address().clone()) {
            env.set_gas(CALL_GAS);
            stable.set_minter(core.address().clone());
        }
        Ok(())
    }
}

/// Prints the pool state of the deployed core.
pub struct PoolStatusScenario;

impl Scenario for PoolStatusScenario {
    fn args(&self) -> Vec<CommandArg> {
        vec![]
    }

    fn run(&self, env: &HostEnv, container: &DeployedContractsContainer, _args: Args) -> Result<(), Error> {
        let core = container.contract_ref::<SynthCore>(env)?;

        let (base, stable) = core.reserves();
        println!("admin:         {:?}", core.admin());
        println!("treasury:      {:?}", core.treasury());
        println!("reserves:      {} base / {} stable", base, stable);
        println!("total shares:  {}", core.total_shares());
        println!("pending burn:  {:?}", core.pending_burn());
        println!("fees:          {:?}", core.fee_schedule());
        Ok(())
    }
}

impl ScenarioMetadata for PoolStatusScenario {
    const NAME: &'static str = "pool-status";
    const DESCRIPTION: &'static str = "Prints reserves, shares, fees and the pending burn of the core";
}

pub fn main() {
    OdraCli::new()
        .about("CLI tool for the synthpool core")
        .deploy(SynthPoolDeployScript)
        .contract::<SynthCore>()
        .contract::<PriceOracle>()
        .contract::<SyntheticToken>()
        .scenario(PoolStatusScenario)
        .build()
        .run();
}
