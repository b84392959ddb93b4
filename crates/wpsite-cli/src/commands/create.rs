use super::{
    json_pretty, print_step, spin_fail, spin_ok, spinner, CommandResult, SpinnerSlot, EXIT_SUCCESS,
};
use wpsite_core::SiteController;
use wpsite_runtime::Provisioned;
use wpsite_schema::SiteName;

pub fn run(
    controller: &SiteController<'_>,
    name: &SiteName,
    json: bool,
    slot: &SpinnerSlot,
) -> CommandResult {
    let pb = (!json).then(|| spinner(&format!("provisioning {name}...")));
    slot.set(pb.clone());
    let result = controller.create_with_progress(name, &|msg: &str| {
        if let Some(pb) = &pb {
            pb.set_message(msg.to_owned());
        }
    });
    slot.set(None);

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            if let Some(pb) = &pb {
                spin_fail(pb, &format!("failed to provision {name}"));
            }
            return Err(e.into());
        }
    };

    if json {
        println!("{}", json_pretty(&report)?);
        return Ok(EXIT_SUCCESS);
    }
    if let Some(pb) = &pb {
        spin_ok(pb, &format!("provisioned {name}"));
    }

    for dep in &report.dependencies {
        match dep.outcome {
            Provisioned::AlreadyInstalled => {}
            Provisioned::Installed => println!("installed {}", dep.name),
            Provisioned::InstallUnsupported => {
                println!("warning: {} is missing; install it manually", dep.name);
            }
        }
    }
    println!("site dir {}", report.site_dir.display());
    print_step("nginx", &report.link);
    print_step("hosts", &report.hosts);
    println!("Your site is running on localhost.");
    Ok(EXIT_SUCCESS)
}
