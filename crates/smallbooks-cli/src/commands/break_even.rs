use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use smallbooks_core::break_even::{
    self, B2bChannel, BreakEvenConfig, ConsumerChannel,
};

use crate::input;

/// Arguments for the break-even solve
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct BreakEvenArgs {
    /// Path to a JSON break-even configuration
    #[arg(long)]
    pub input: Option<String>,

    /// Monthly fixed costs to cover
    #[arg(long)]
    pub fixed_costs: Decimal,

    /// Average consumer selling price per unit
    #[arg(long)]
    pub price: Option<Decimal>,

    /// Average consumer cost of goods per unit
    #[arg(long, default_value = "0")]
    pub unit_cogs: Decimal,

    /// Committed B2B units per month
    #[arg(long)]
    pub b2b_units: Option<Decimal>,

    /// B2B rate per unit
    #[arg(long, default_value = "0")]
    pub b2b_rate: Decimal,

    /// B2B cost of goods per unit
    #[arg(long, default_value = "0")]
    pub b2b_cogs: Decimal,
}

/// Arguments for the cost-volume-profit chart
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct ChartArgs {
    #[command(flatten)]
    pub solve: BreakEvenArgs,

    /// Timeline length in months
    #[arg(long, default_value = "12")]
    pub months: i64,

    /// Step size on the consumer-unit axis
    #[arg(long)]
    pub unit_increment: Option<Decimal>,
}

fn build_config(args: &BreakEvenArgs) -> Result<BreakEvenConfig, Box<dyn std::error::Error>> {
    if let Some(ref path) = args.input {
        return Ok(input::file::read_json(path)?);
    }
    if let Some(config) = input::stdin::read_stdin()? {
        return Ok(config);
    }

    let mut config = BreakEvenConfig::default();
    if let Some(price) = args.price {
        config.consumer = ConsumerChannel {
            enabled: true,
            avg_price: price,
            avg_cogs: args.unit_cogs,
        };
    }
    if let Some(units) = args.b2b_units {
        config.b2b = B2bChannel {
            enabled: true,
            monthly_units: units,
            rate_per_unit: args.b2b_rate,
            cogs_per_unit: args.b2b_cogs,
        };
    }
    if config.consumer.enabled || config.b2b.enabled {
        Ok(config)
    } else {
        Err("--price or --b2b-units is required (or provide --input)".into())
    }
}

pub fn run_break_even(args: BreakEvenArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let config = build_config(&args)?;
    let result = break_even::compute_break_even(&config, args.fixed_costs)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_chart(args: ChartArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut config = build_config(&args.solve)?;
    if let Some(increment) = args.unit_increment {
        config.unit_increment = increment;
    }
    if args.months <= 0 {
        return Err("--months must be positive".into());
    }
    if config.unit_increment <= dec!(0) {
        return Err("--unit-increment must be positive".into());
    }

    let result =
        break_even::compute_break_even_chart(&config, args.solve.fixed_costs, args.months)?;
    Ok(serde_json::to_value(result)?)
}
