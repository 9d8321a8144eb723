//! Project subcommands: the presentation layer over `realay-projects`.

use std::io::{self, BufRead, Write};

use {
    anyhow::{Result, bail},
    realay_common::{NoopPreCheckin, PreCheckinHook},
    realay_projects::{Error, Project, ProjectRegistry},
    tracing::warn,
};

use crate::{Session, pre_checkin::ShellPreCheckin};

pub fn list(session: &Session) -> Result<()> {
    let root = session.remote_root()?;
    let result = ProjectRegistry::new(session.ctx.clone()).scan(root)?;

    if result.projects.is_empty() && result.non_projects.is_empty() {
        println!("Nothing found in {}.", root.display());
        return Ok(());
    }
    for project in &result.projects {
        println!("{project}");
    }
    for path in &result.non_projects {
        println!("[non-project] {}", path.display());
    }
    Ok(())
}

pub fn create(session: &Session, name: &str) -> Result<()> {
    let root = session.remote_root()?;
    let result = ProjectRegistry::new(session.ctx.clone()).scan(root)?;
    let Some(dir) = result.find_non_project(name) else {
        if result.find(name).is_some() {
            bail!("{name} is already a project");
        }
        bail!("no directory named {name} in {}", root.display());
    };

    let project = Project::create(dir, session.ctx.clone()).map_err(describe)?;
    println!("Created {project}");
    Ok(())
}

pub fn checkout(session: &Session, name: &str, yes: bool) -> Result<()> {
    let user = session.user()?;
    let mut project = open_project(session, name)?;
    let local = session.local_path(project.name())?;

    let prompt = format!(
        "Really check out {name}? Your local copy will be obliterated and replaced with what's in the shared folder.\n\
         Local copy: {}\nShared copy: {}",
        local.display(),
        project.path().display()
    );
    if !yes && !confirm(&prompt)? {
        println!("Checkout cancelled.");
        return Ok(());
    }

    let stats = project.checkout(&user, &local).map_err(describe)?;
    println!(
        "Checked out {name} to {} ({} files).",
        local.display(),
        stats.files
    );
    Ok(())
}

pub fn checkin(session: &Session, name: &str, yes: bool) -> Result<()> {
    let user = session.user()?;
    let mut project = open_project(session, name)?;
    let local = session.local_path(project.name())?;

    let prompt = format!(
        "Really check in {name}? This will replace whatever's in the shared folder.\n\
         Local copy: {}\nShared copy: {}",
        local.display(),
        project.path().display()
    );
    if !yes && !confirm(&prompt)? {
        println!("Checkin cancelled.");
        return Ok(());
    }

    pre_checkin_hook(session).before_checkin(project.name(), &local)?;

    let stats = project.checkin(&user, &local).map_err(describe)?;
    println!(
        "Checked in {name} from {} ({} files).",
        local.display(),
        stats.files
    );
    Ok(())
}

pub fn note(session: &Session, name: &str, text: &str) -> Result<()> {
    let mut project = open_project(session, name)?;
    project.add_note(text).map_err(describe)?;
    println!("Added note to {name}.");
    Ok(())
}

pub fn show(session: &Session, name: &str, json: bool) -> Result<()> {
    let project = open_project(session, name)?;
    let meta = project.metadata();

    if json {
        println!("{}", serde_json::to_string_pretty(meta)?);
        return Ok(());
    }

    println!("Project:       {}", project.name());
    println!("Path:          {}", project.path().display());
    println!("Project file:  {}", project.primary_file().display());
    println!("Status:        {}", meta.status_label());
    if let Some(date) = meta.checkout_date {
        println!("Checked out:   {}", date.to_rfc3339());
    }
    if let Some(ref who) = meta.last_modified_by {
        println!("Last checkin:  {who}");
    }
    if let Some(date) = meta.last_updated_date {
        println!("Last updated:  {}", date.to_rfc3339());
    }
    if !meta.notes.is_empty() {
        println!("Notes:");
        for note in &meta.notes {
            println!("  - {note}");
        }
    }
    if !meta.is_consistent() {
        warn!(project = %project.name(), "lock record is inconsistent");
    }
    Ok(())
}

/// Find `name` in the shared root, surfacing why it cannot be opened.
fn open_project(session: &Session, name: &str) -> Result<Project> {
    let root = session.remote_root()?;
    let mut result = ProjectRegistry::new(session.ctx.clone()).scan(root)?;
    if let Some(project) = result.take(name) {
        return Ok(project);
    }
    if result.find_non_project(name).is_some() {
        bail!("{name} is not a project yet; run `realay create {name}` first");
    }
    let dir = root.join(name);
    if Project::is_project(&dir) {
        // skipped by the scan; load again to report why
        return Project::load(&dir, session.ctx.clone()).map_err(describe);
    }
    bail!("no project named {name} in {}", root.display())
}

fn pre_checkin_hook(session: &Session) -> Box<dyn PreCheckinHook> {
    match &session.config.hooks.pre_checkin {
        Some(cmd) => Box::new(ShellPreCheckin::new(cmd.clone())),
        None => Box::new(NoopPreCheckin),
    }
}

/// Turn core errors into operator messages.
fn describe(err: Error) -> anyhow::Error {
    match &err {
        Error::AlreadyCheckedOut { project, holder } => anyhow::anyhow!(
            "Couldn't perform checkout: {project} is checked out by {}",
            holder.as_deref().unwrap_or("someone else")
        ),
        Error::NotCheckedOut { .. } | Error::CheckedOutByOther { .. } => {
            anyhow::anyhow!("Couldn't perform checkin: {err}")
        },
        Error::Transfer {
            operation, status, ..
        } => anyhow::anyhow!(
            "{err}\nThe lock was already recorded as {status}; re-run the {operation} once the problem is fixed."
        ),
        _ => err.into(),
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    let stdin = io::stdin();
    confirm_with(prompt, &mut stdin.lock(), &mut io::stderr())
}

fn confirm_with(prompt: &str, input: &mut impl BufRead, out: &mut impl Write) -> Result<bool> {
    write!(out, "{prompt}\nContinue? [y/N] ")?;
    out.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, realay_projects::ProjectStatus};

    #[test]
    fn confirm_accepts_yes_variants() {
        for answer in ["y\n", "YES\n", "  yes  \n"] {
            let mut out = Vec::new();
            assert!(confirm_with("go?", &mut answer.as_bytes(), &mut out).unwrap());
            assert!(String::from_utf8(out).unwrap().contains("[y/N]"));
        }
    }

    #[test]
    fn confirm_defaults_to_no() {
        for answer in ["\n", "n\n", "sure\n", ""] {
            let mut out = Vec::new();
            assert!(!confirm_with("go?", &mut answer.as_bytes(), &mut out).unwrap());
        }
    }

    #[test]
    fn describe_names_the_holder() {
        let msg = describe(Error::AlreadyCheckedOut {
            project: "song".into(),
            holder: Some("alice".into()),
        })
        .to_string();
        assert_eq!(
            msg,
            "Couldn't perform checkout: song is checked out by alice"
        );
    }

    #[test]
    fn describe_explains_partial_copies() {
        let err = Error::transfer(
            "checkin",
            ProjectStatus::Ready,
            Error::message("disk full"),
        );
        let msg = describe(err).to_string();
        assert!(msg.contains("recorded as ready"));
        assert!(msg.contains("re-run the checkin"));
    }
}
