use anyhow::{bail, Result};

use fieldservice::db::Database;
use fieldservice::models::Engineer;

/// The signed-in engineer, or an error telling the user to sign in.
pub fn require_engineer(db: &Database) -> Result<Engineer> {
    let session = match db.get_current_session()? {
        Some(s) => s,
        None => bail!("Not signed in. Run 'fieldservice login <email>' first."),
    };
    match db.get_engineer(session.engineer_id)? {
        Some(e) => Ok(e),
        None => bail!("Engineer #{} for the current session no longer exists", session.engineer_id),
    }
}

pub fn login(db: &Database, email: &str) -> Result<()> {
    let engineer = match db.get_engineer_by_email(email)? {
        Some(e) => e,
        None => bail!("No engineer registered with email '{}'", email),
    };

    db.start_session(engineer.id)?;
    tracing::info!(engineer_id = engineer.id, "signed in");
    println!("Signed in as {} <{}>", engineer.name, engineer.email);
    Ok(())
}

pub fn logout(db: &Database) -> Result<()> {
    match db.get_current_session()? {
        Some(session) => {
            db.end_session(session.id)?;
            tracing::info!(engineer_id = session.engineer_id, "signed out");
            println!("Signed out {}", session.email);
        }
        None => println!("Not signed in."),
    }
    Ok(())
}

pub fn whoami(db: &Database) -> Result<()> {
    match db.get_current_session()? {
        Some(session) => {
            let name = db
                .get_engineer(session.engineer_id)?
                .map(|e| e.name)
                .unwrap_or_else(|| "(deleted)".to_string());
            println!("Engineer #{}: {} <{}>", session.engineer_id, name, session.email);
            println!(
                "Signed in since {}",
                session.started_at.format("%Y-%m-%d %H:%M:%S")
            );
        }
        None => println!("Not signed in."),
    }
    Ok(())
}
