//! Textual query command
//!
//! Usage: querystudy query --db <PATH> "<QUERY>" [--param NAME=VALUE]...

use super::StoreArgs;
use clap::Args;
use querystudy_core::{DynamicRow, Value};
use querystudy_store::Session;

#[derive(Debug, Args)]
pub struct QueryArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Query text, e.g. "select m from Member m where m.age > :age"
    pub text: String,

    /// Named parameter binding; integers bind as numbers, anything else as text
    #[arg(long = "param", value_name = "NAME=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, Value)>,
}

fn parse_param(raw: &str) -> Result<(String, Value), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", raw))?;
    let name = name.trim_start_matches(':');
    if name.is_empty() {
        return Err(format!("empty parameter name in '{}'", raw));
    }
    let value = match value.parse::<i64>() {
        Ok(i) => Value::Integer(i),
        Err(_) => Value::Text(value.to_string()),
    };
    Ok((name.to_string(), value))
}

/// Execute query command
pub fn execute(args: QueryArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.store.store_config()?;
    let mut conn = config.open()?;
    let mut session = Session::begin(&mut conn, config.flush_mode)?;

    let mut query = session.create_query::<DynamicRow>(&args.text)?;
    for (name, value) in args.params {
        query.set_parameter(&name, value);
    }

    for row in query.iterate()? {
        println!("{}", serde_json::to_string(&row?)?);
    }

    Ok(())
}
