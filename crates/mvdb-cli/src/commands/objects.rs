//! Object inspection

use clap::Args;
use mvdb_engine::{ModelVersionDb, RevSelector};
use uuid::Uuid;

use super::CommandResult;

#[derive(Debug, Args)]
pub struct ObjectsArgs {
    /// Only objects of this type
    #[arg(long = "type")]
    pub type_id: Option<Uuid>,
}

#[derive(Debug, Args)]
pub struct StateArgs {
    pub id: Uuid,

    /// Revision number or `last`
    #[arg(long, default_value = "last")]
    pub rev: RevSelector,
}

#[derive(Debug, Args)]
pub struct RevsArgs {
    pub id: Uuid,
}

pub fn execute_objects(db: &ModelVersionDb, args: ObjectsArgs) -> CommandResult {
    let ids = match args.type_id {
        Some(type_id) => db.get_objects_of_type(type_id)?,
        None => db.get_objects()?,
    };
    for id in ids {
        println!("{}", id);
    }
    Ok(())
}

pub fn execute_state(db: &ModelVersionDb, args: StateArgs) -> CommandResult {
    let state = db.get_object_state(args.id, args.rev)?;
    for (name, value) in state {
        println!("{} = {}", name, value);
    }
    Ok(())
}

pub fn execute_revs(db: &ModelVersionDb, args: RevsArgs) -> CommandResult {
    let type_id = db.get_object_type(args.id)?;
    println!("type: {}", type_id);
    for rev in db.get_object_rev_nbs(args.id)? {
        println!("{}", rev);
    }
    Ok(())
}
