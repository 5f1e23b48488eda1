use crate::context::UpgradeOptions;
use crate::step::{StepLogic, UpgradeStep};
use camino::Utf8Path;
use uplift_types::step::StepMeta;

mod backup;
mod references;

pub use backup::{BACKUP_STEP_ID, BackupStep};
pub use references::{REFERENCE_STEP_ID, ReferenceUpdateStep};

fn builtin_logic(project: &Utf8Path, map: &Utf8Path, options: &UpgradeOptions) -> Vec<Box<dyn StepLogic>> {
    vec![
        Box::new(BackupStep::new(project, &options.backups.suffix)),
        Box::new(ReferenceUpdateStep::new(project, map)),
    ]
}

/// The default upgrade, in declared order.
pub fn builtin_steps(project: &Utf8Path, map: &Utf8Path, options: &UpgradeOptions) -> Vec<UpgradeStep> {
    builtin_logic(project, map, options)
        .into_iter()
        .map(UpgradeStep::new)
        .collect()
}

pub fn builtin_step_metas(project: &Utf8Path, map: &Utf8Path, options: &UpgradeOptions) -> Vec<StepMeta> {
    builtin_logic(project, map, options)
        .iter()
        .map(|l| l.meta())
        .collect()
}
