//! Domain Models

pub mod delivery;
pub mod jornada;
pub mod register;
pub mod roster;
pub mod salary;
pub mod settlement;

pub use delivery::{Delivery, FraudAttempt, FraudKind, FraudVerdict};
pub use jornada::{Jornada, JornadaState, ShiftStatus};
pub use register::{CloseStatus, RegisterClose, RegisterOpening, RegisterState, TenderTotals};
pub use roster::RosterEntry;
pub use salary::{RoleSalaryConfig, ScheduleAssignment};
pub use settlement::{
    AdvanceKind, EmployeeAdvance, EmployeePayment, EmployeeShift, PaymentType,
};
