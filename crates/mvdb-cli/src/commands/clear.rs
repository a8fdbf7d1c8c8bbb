//! Store reset

use mvdb_engine::ModelVersionDb;

use super::CommandResult;

pub fn execute(db: &mut ModelVersionDb) -> CommandResult {
    let objects = db.get_objects()?.len();
    let links = db.get_links()?.len();
    db.clear()?;
    println!("removed {} objects and {} links", objects, links);
    Ok(())
}
