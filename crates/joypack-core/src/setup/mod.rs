//! The individual stages of a server setup.

pub mod build;
pub mod prerequisites;
pub mod repository;
pub mod step;
pub mod wrapper;

pub use build::{
    BuildContext, BuildOverrides, BuildPhase, BuildRoutine, GenericBuild, ScriptedBuild,
    run_phases,
};
pub use prerequisites::{PrerequisiteChecker, installer_steps, prerequisite_step};
pub use repository::{GitProvisioner, Provisioner, repository_dir_name};
pub use step::StepReporter;
pub use wrapper::{GeneratedWrapper, WrapperGenerator, registry_host};
