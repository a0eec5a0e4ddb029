use serde::Serialize;
use twmon_core::catalog;
use twmon_core::{ProviderId, Sector, StockId};

use crate::error::CliError;
use crate::output::Table;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct SectorEntry {
    sector: Sector,
    label: &'static str,
    members: Vec<MemberEntry>,
}

#[derive(Debug, Serialize)]
struct MemberEntry {
    stock_id: StockId,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'static str>,
}

pub fn run() -> Result<CommandResult, CliError> {
    let sectors = Sector::ALL
        .iter()
        .map(|sector| SectorEntry {
            sector: *sector,
            label: sector.label(),
            members: sector
                .stock_ids()
                .into_iter()
                .map(|stock_id| MemberEntry {
                    name: catalog::display_name(&stock_id),
                    stock_id,
                })
                .collect(),
        })
        .collect::<Vec<_>>();

    let mut table = Table::new(["sector", "label", "members"]);
    for entry in &sectors {
        let members = entry
            .members
            .iter()
            .map(|member| match member.name {
                Some(name) => format!("{} {name}", member.stock_id),
                None => member.stock_id.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ");
        table.push_row(vec![
            entry.sector.to_string(),
            entry.label.to_owned(),
            members,
        ]);
    }

    let default_watchlist = catalog::DEFAULT_WATCHLIST.join(", ");
    let data = serde_json::json!({
        "sectors": sectors,
        "default_watchlist": catalog::DEFAULT_WATCHLIST,
    });

    Ok(CommandResult::ok(data, vec![ProviderId::Catalog])
        .with_table(table)
        .with_notes(vec![format!("default watch list: {default_watchlist}")]))
}
