use super::{json_pretty, spin_fail, spin_ok, spinner, CommandResult, EXIT_SUCCESS};
use serde::Serialize;
use wpsite_core::{SiteController, SiteState, ToggleAction};
use wpsite_schema::SiteName;

#[derive(Serialize)]
struct ToggleResult<'a> {
    name: &'a SiteName,
    action: ToggleAction,
    state: SiteState,
}

pub fn run(
    controller: &SiteController<'_>,
    name: &SiteName,
    action: ToggleAction,
    json: bool,
) -> CommandResult {
    let pb = (!json).then(|| match action {
        ToggleAction::Enable => spinner(&format!("starting {name}...")),
        ToggleAction::Disable => spinner(&format!("stopping {name}...")),
    });

    if let Err(e) = controller.enable_disable(name, action) {
        if let Some(pb) = &pb {
            spin_fail(pb, &format!("failed to {action} {name}"));
        }
        return Err(e.into());
    }

    if json {
        let result = ToggleResult {
            name,
            action,
            state: controller.state(name),
        };
        println!("{}", json_pretty(&result)?);
    } else if let Some(pb) = &pb {
        match action {
            ToggleAction::Enable => spin_ok(pb, &format!("Site {name} enabled.")),
            ToggleAction::Disable => spin_ok(pb, &format!("Site {name} disabled.")),
        }
    }
    Ok(EXIT_SUCCESS)
}
