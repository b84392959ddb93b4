use super::{colorize_state, json_pretty, CommandResult, EXIT_SUCCESS};
use wpsite_core::SiteController;
use wpsite_runtime::format_missing;
use wpsite_schema::SiteName;

fn presence(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "present",
        Some(false) => "missing",
        None => "unsupported",
    }
}

pub fn run(controller: &SiteController<'_>, name: &SiteName, json: bool) -> CommandResult {
    let status = controller.status(name)?;
    if json {
        println!("{}", json_pretty(&status)?);
        return Ok(EXIT_SUCCESS);
    }

    println!("name:        {}", status.name);
    println!("state:       {}", colorize_state(&status.state.to_string()));
    println!("site_dir:    {}", status.site_dir.display());
    println!(
        "updated_at:  {}",
        status.updated_at.as_deref().unwrap_or("(never)")
    );
    println!("nginx link:  {}", presence(status.link_present));
    println!("hosts entry: {}", presence(status.hosts_entry));
    if let Some(containers) = &status.containers {
        println!();
        print!("{containers}");
    }
    if !status.missing_dependencies.is_empty() {
        println!();
        println!("{}", format_missing(&status.missing_dependencies));
    }
    Ok(EXIT_SUCCESS)
}
