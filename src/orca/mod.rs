//! ORCA constraint construction and resolution (C4 + C5).

pub mod agent;
pub mod line;
pub mod lp;
pub mod obstacle;

pub use agent::{agent_agent_line, AgentSnapshot};
pub use line::OrcaLine;
pub use lp::{linear_program_2, linear_program_3};
pub use obstacle::build_obstacle_lines;
