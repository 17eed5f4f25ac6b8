//! Assembly of a complete Pybricks program
//!
//! The drive base (its motors, `DriveBase` import and settings line) is only
//! emitted when some statement drives the robot, so attachment-only programs
//! stay minimal.

use crate::config::RobotDefaults;
use crate::routines::ParsedRoutine;
use serde::Serialize;

const ROUTINES_HEADER: &str = "# Routines/Functions";
const MAIN_HEADER: &str = "# Main program";
const EMPTY_MAIN: &str = "# Add your commands here\npass";

/// A generated program, section by section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedProgram {
    pub imports: String,
    pub setup: String,
    /// Empty when there are no routines
    pub routines: String,
    pub main: String,
    pub full: String,
}

fn drives_robot(statement: &str) -> bool {
    statement.trim_start().starts_with("robot.")
        || statement.contains("left_motor")
        || statement.contains("right_motor")
}

fn port_configured(port: &Option<String>) -> Option<&str> {
    port.as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty() && !p.eq_ignore_ascii_case("none"))
}

fn generate_imports(needs_drivebase: bool) -> String {
    let mut imports = vec![
        "from pybricks.hubs import PrimeHub",
        "from pybricks.pupdevices import Motor",
        "from pybricks.parameters import Port, Direction, Stop",
    ];
    if needs_drivebase {
        imports.push("from pybricks.robotics import DriveBase");
    }
    imports.push("from pybricks.tools import wait");
    imports.join("\n")
}

fn generate_setup(defaults: &RobotDefaults, needs_drivebase: bool) -> String {
    let mut lines = vec![
        "# Initialize hub".to_string(),
        "hub = PrimeHub()".to_string(),
        String::new(),
    ];

    if needs_drivebase {
        lines.push("# Motor setup".to_string());
        lines.push(format!(
            "left_motor = Motor(Port.{}, Direction.COUNTERCLOCKWISE)",
            defaults.left_motor_port
        ));
        lines.push(format!(
            "right_motor = Motor(Port.{}, Direction.CLOCKWISE)",
            defaults.right_motor_port
        ));
        lines.push(String::new());
        lines.push("# DriveBase setup".to_string());
        lines.push(format!(
            "robot = DriveBase(left_motor, right_motor, wheel_diameter={}, axle_track={})",
            defaults.wheel_diameter, defaults.axle_track
        ));
        lines.push(format!(
            "robot.settings(straight_speed={}, straight_acceleration={}, turn_rate={}, turn_acceleration={})",
            defaults.speed.trunc() as i64,
            defaults.acceleration.trunc() as i64,
            defaults.turn_rate.trunc() as i64,
            defaults.turn_acceleration.trunc() as i64,
        ));
        lines.push(String::new());
    }

    if let Some(port) = port_configured(&defaults.attachment1_port) {
        lines.push("# Attachment motors".to_string());
        lines.push(format!("attachment1 = Motor(Port.{port})"));
        if let Some(port) = port_configured(&defaults.attachment2_port) {
            lines.push(format!("attachment2 = Motor(Port.{port})"));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

fn generate_routines(routines: &[ParsedRoutine]) -> String {
    if routines.is_empty() {
        return String::new();
    }
    let mut lines = vec![ROUTINES_HEADER.to_string()];
    for routine in routines {
        lines.push(routine.code.clone());
        lines.push(String::new());
    }
    lines.join("\n")
}

/// Build the program from main-code statements and compiled routines.
pub fn generate_program<S: AsRef<str>>(
    defaults: &RobotDefaults,
    commands: &[S],
    routines: &[ParsedRoutine],
) -> GeneratedProgram {
    let needs_drivebase = commands
        .iter()
        .flat_map(|c| c.as_ref().lines())
        .chain(routines.iter().flat_map(|r| r.code.lines()))
        .any(drives_robot);

    let imports = generate_imports(needs_drivebase);
    let setup = generate_setup(defaults, needs_drivebase);
    let routines = generate_routines(routines);
    let main = if commands.is_empty() {
        EMPTY_MAIN.to_string()
    } else {
        commands
            .iter()
            .map(|c| c.as_ref())
            .collect::<Vec<_>>()
            .join("\n")
    };

    let mut parts = vec![imports.as_str(), "", setup.as_str()];
    if !routines.is_empty() {
        parts.extend(["", routines.as_str()]);
    }
    parts.extend(["", MAIN_HEADER, main.as_str()]);
    let full = parts.join("\n");

    GeneratedProgram {
        imports,
        setup,
        routines,
        main,
        full,
    }
}
