use crate::api::{QanApi, TableRef};
use crate::cli::TableAction;
use crate::details::{self, DetailView, DetailsLoader};
use crate::error::{Error, Result};
use crate::params::ViewParameters;

/// Add or remove a table reference of the query selected in `params`.
///
/// The backend stores the whole set, so the current set is loaded first.
pub async fn run<A: QanApi>(
    api: &A,
    params: &ViewParameters,
    action: TableAction,
    table: &str,
) -> Result<()> {
    let view = DetailsLoader::new(api).load(params).await?;
    let DetailView::Query { mut identity, .. } = view else {
        return Err(Error::InvalidArgument(
            "Tables can only be edited for a single query".to_string(),
        ));
    };

    match action {
        TableAction::Add => {
            let added = details::add_table(api, &mut identity, table).await?;
            eprintln!("Added {} to query {}", added, identity.query_id);
        }
        TableAction::Remove => {
            let table = TableRef::parse(table)?;
            if !details::remove_table(api, &mut identity, &table).await {
                return Err(Error::InvalidArgument(format!(
                    "Query {} does not reference {}",
                    identity.query_id, table
                )));
            }
            eprintln!("Removed {} from query {}", table, identity.query_id);
        }
    }

    for table in &identity.tables {
        println!("{}", table);
    }
    Ok(())
}
