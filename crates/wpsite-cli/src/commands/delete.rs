use super::{json_pretty, print_step, CommandResult, EXIT_SUCCESS};
use wpsite_core::SiteController;
use wpsite_schema::SiteName;

pub fn run(controller: &SiteController<'_>, name: &SiteName, json: bool) -> CommandResult {
    let report = controller.delete(name)?;
    if json {
        println!("{}", json_pretty(&report)?);
    } else {
        if !report.containers_removed {
            println!("no compose file found; containers were not torn down");
        }
        print_step("nginx", &report.link);
        print_step("hosts", &report.hosts);
        println!("Site {name} deleted.");
    }
    Ok(EXIT_SUCCESS)
}
