//! Link inspection

use clap::Args;
use mvdb_engine::{ModelVersionDb, RevSelector};
use uuid::Uuid;

use super::CommandResult;

#[derive(Debug, Args)]
pub struct LinksArgs {
    /// Only links of this type
    #[arg(long = "type")]
    pub type_id: Option<Uuid>,
}

#[derive(Debug, Args)]
pub struct OutgoingArgs {
    /// Link type
    pub type_id: Uuid,

    /// Source object
    pub src: Uuid,

    /// Source revision: a number, `last` or `all`
    #[arg(long, default_value = "last")]
    pub rev: RevSelector,
}

pub fn execute_links(db: &ModelVersionDb, args: LinksArgs) -> CommandResult {
    let ids: Vec<Uuid> = match args.type_id {
        Some(type_id) => db.get_links_of_type(type_id)?,
        None => db.get_links()?.into_iter().collect(),
    };
    for id in ids {
        println!(
            "{} {} -> {}",
            id,
            db.get_link_src(id)?,
            db.get_link_dest(id)?
        );
    }
    Ok(())
}

pub fn execute_outgoing(db: &ModelVersionDb, args: OutgoingArgs) -> CommandResult {
    for link in db.get_outgoing_links(args.type_id, args.src, args.rev)? {
        let dest = db.get_link_dest(link.id)?;
        println!("{} -> {}", link, dest);
    }
    Ok(())
}
