//! Command Catalog
//!
//! Every standard descriptor as a named constant, grouped per mode, plus a
//! lookup table by command text built once on first use.

use crate::decode::DecodeRule;
use crate::dtc::DtcStatus;
use crate::pid::Command;
use once_cell::sync::Lazy;
use std::collections::HashMap;

macro_rules! commands {
    ($group:ident { $($name:ident => ($text:literal, $desc:literal, $bytes:expr, $rule:expr)),* $(,)? }) => {
        $(pub const $name: Command = Command::standard($text, $desc, $bytes, $rule);)*

        pub const $group: &[Command] = &[$($name),*];
    };
}

commands!(GENERAL {
    ATD => ("ATD", "Set to default", 0, DecodeRule::None),
    ATZ => ("ATZ", "Reset", 0, DecodeRule::None),
    ATRV => ("ATRV", "Voltage", 0, DecodeRule::None),
    ATL0 => ("ATL0", "Linefeeds Off", 0, DecodeRule::None),
    ATE0 => ("ATE0", "Echo Off", 0, DecodeRule::None),
    ATH1 => ("ATH1", "Headers On", 0, DecodeRule::None),
    ATH0 => ("ATH0", "Headers Off", 0, DecodeRule::None),
    ATAT1 => ("ATAT1", "Adaptive Timing On", 0, DecodeRule::None),
    ATSTFF => ("ATSTFF", "Set Time to Fast", 0, DecodeRule::None),
    ATDPN => ("ATDPN", "Describe Protocol Number", 0, DecodeRule::None),
});

// Widths count the PID echo byte.
commands!(MODE1 {
    PIDS_A => ("0100", "Supported PIDs [01-20]", 5, DecodeRule::Pid),
    STATUS => ("0101", "Status since DTCs cleared", 5, DecodeRule::Status),
    FREEZE_DTC => ("0102", "DTC that triggered the freeze frame", 3, DecodeRule::SingleDtc),
    FUEL_STATUS => ("0103", "Fuel System Status", 3, DecodeRule::FuelStatus),
    ENGINE_LOAD => ("0104", "Calculated Engine Load", 2, DecodeRule::Percent),
    COOLANT_TEMP => ("0105", "Engine Coolant Temperature", 2, DecodeRule::Temp),
    SHORT_FUEL_TRIM_1 => ("0106", "Short Term Fuel Trim - Bank 1", 2, DecodeRule::PercentCentered),
    LONG_FUEL_TRIM_1 => ("0107", "Long Term Fuel Trim - Bank 1", 2, DecodeRule::PercentCentered),
    SHORT_FUEL_TRIM_2 => ("0108", "Short Term Fuel Trim - Bank 2", 2, DecodeRule::PercentCentered),
    LONG_FUEL_TRIM_2 => ("0109", "Long Term Fuel Trim - Bank 2", 2, DecodeRule::PercentCentered),
    FUEL_PRESSURE => ("010A", "Fuel Pressure", 2, DecodeRule::FuelPressure),
    INTAKE_PRESSURE => ("010B", "Intake Manifold Pressure", 2, DecodeRule::Pressure),
    RPM => ("010C", "Engine RPM", 3, DecodeRule::Uas(0x07)),
    SPEED => ("010D", "Vehicle Speed", 2, DecodeRule::Uas(0x09)),
    TIMING_ADVANCE => ("010E", "Timing Advance", 2, DecodeRule::TimingAdvance),
    INTAKE_TEMP => ("010F", "Intake Air Temp", 2, DecodeRule::Temp),
    MAF => ("0110", "Air Flow Rate (MAF)", 3, DecodeRule::Uas(0x27)),
    THROTTLE_POS => ("0111", "Throttle Position", 2, DecodeRule::Percent),
    AIR_STATUS => ("0112", "Secondary Air Status", 2, DecodeRule::AirStatus),
    O2_SENSORS => ("0113", "O2 Sensors Present", 2, DecodeRule::O2Sensors),
    O2_B1S1 => ("0114", "O2: Bank 1 - Sensor 1 Voltage", 3, DecodeRule::SensorVoltage),
    O2_B1S2 => ("0115", "O2: Bank 1 - Sensor 2 Voltage", 3, DecodeRule::SensorVoltage),
    O2_B1S3 => ("0116", "O2: Bank 1 - Sensor 3 Voltage", 3, DecodeRule::SensorVoltage),
    O2_B1S4 => ("0117", "O2: Bank 1 - Sensor 4 Voltage", 3, DecodeRule::SensorVoltage),
    O2_B2S1 => ("0118", "O2: Bank 2 - Sensor 1 Voltage", 3, DecodeRule::SensorVoltage),
    O2_B2S2 => ("0119", "O2: Bank 2 - Sensor 2 Voltage", 3, DecodeRule::SensorVoltage),
    O2_B2S3 => ("011A", "O2: Bank 2 - Sensor 3 Voltage", 3, DecodeRule::SensorVoltage),
    O2_B2S4 => ("011B", "O2: Bank 2 - Sensor 4 Voltage", 3, DecodeRule::SensorVoltage),
    OBD_COMPLIANCE => ("011C", "OBD Standards Compliance", 2, DecodeRule::ObdCompliance),
    O2_SENSORS_ALT => ("011D", "O2 Sensors Present (alternate)", 2, DecodeRule::O2SensorsAlt),
    AUX_INPUT_STATUS => ("011E", "Auxiliary input status (power take off)", 2, DecodeRule::AuxInputStatus),
    RUN_TIME => ("011F", "Engine Run Time", 3, DecodeRule::Uas(0x12)),
    PIDS_B => ("0120", "Supported PIDs [21-40]", 5, DecodeRule::Pid),
    DISTANCE_W_MIL => ("0121", "Distance Traveled with MIL on", 3, DecodeRule::Uas(0x25)),
    FUEL_RAIL_PRESSURE_VAC => ("0122", "Fuel Rail Pressure (relative to vacuum)", 3, DecodeRule::Uas(0x19)),
    FUEL_RAIL_PRESSURE_DIRECT => ("0123", "Fuel Rail Pressure (direct inject)", 3, DecodeRule::Uas(0x1B)),
    O2_S1_WR_VOLTAGE => ("0124", "O2 Sensor 1 WR Lambda Voltage", 5, DecodeRule::SensorVoltageBig),
    O2_S2_WR_VOLTAGE => ("0125", "O2 Sensor 2 WR Lambda Voltage", 5, DecodeRule::SensorVoltageBig),
    O2_S3_WR_VOLTAGE => ("0126", "O2 Sensor 3 WR Lambda Voltage", 5, DecodeRule::SensorVoltageBig),
    O2_S4_WR_VOLTAGE => ("0127", "O2 Sensor 4 WR Lambda Voltage", 5, DecodeRule::SensorVoltageBig),
    O2_S5_WR_VOLTAGE => ("0128", "O2 Sensor 5 WR Lambda Voltage", 5, DecodeRule::SensorVoltageBig),
    O2_S6_WR_VOLTAGE => ("0129", "O2 Sensor 6 WR Lambda Voltage", 5, DecodeRule::SensorVoltageBig),
    O2_S7_WR_VOLTAGE => ("012A", "O2 Sensor 7 WR Lambda Voltage", 5, DecodeRule::SensorVoltageBig),
    O2_S8_WR_VOLTAGE => ("012B", "O2 Sensor 8 WR Lambda Voltage", 5, DecodeRule::SensorVoltageBig),
    COMMANDED_EGR => ("012C", "Commanded EGR", 2, DecodeRule::Percent),
    EGR_ERROR => ("012D", "EGR Error", 2, DecodeRule::PercentCentered),
    EVAPORATIVE_PURGE => ("012E", "Commanded Evaporative Purge", 2, DecodeRule::Percent),
    FUEL_LEVEL => ("012F", "Fuel Tank Level Input", 2, DecodeRule::Percent),
    WARMUPS_SINCE_DTC_CLEAR => ("0130", "Number of warm-ups since codes cleared", 2, DecodeRule::Uas(0x01)),
    DISTANCE_SINCE_DTC_CLEAR => ("0131", "Distance traveled since codes cleared", 3, DecodeRule::Uas(0x25)),
    EVAP_VAPOR_PRESSURE => ("0132", "Evaporative system vapor pressure", 3, DecodeRule::EvapPressure),
    BAROMETRIC_PRESSURE => ("0133", "Barometric Pressure", 2, DecodeRule::Pressure),
    O2_S1_WR_CURRENT => ("0134", "O2 Sensor 1 WR Lambda Current", 5, DecodeRule::CurrentCentered),
    O2_S2_WR_CURRENT => ("0135", "O2 Sensor 2 WR Lambda Current", 5, DecodeRule::CurrentCentered),
    O2_S3_WR_CURRENT => ("0136", "O2 Sensor 3 WR Lambda Current", 5, DecodeRule::CurrentCentered),
    O2_S4_WR_CURRENT => ("0137", "O2 Sensor 4 WR Lambda Current", 5, DecodeRule::CurrentCentered),
    O2_S5_WR_CURRENT => ("0138", "O2 Sensor 5 WR Lambda Current", 5, DecodeRule::CurrentCentered),
    O2_S6_WR_CURRENT => ("0139", "O2 Sensor 6 WR Lambda Current", 5, DecodeRule::CurrentCentered),
    O2_S7_WR_CURRENT => ("013A", "O2 Sensor 7 WR Lambda Current", 5, DecodeRule::CurrentCentered),
    O2_S8_WR_CURRENT => ("013B", "O2 Sensor 8 WR Lambda Current", 5, DecodeRule::CurrentCentered),
    CATALYST_TEMP_B1S1 => ("013C", "Catalyst Temperature: Bank 1 - Sensor 1", 3, DecodeRule::Uas(0x16)),
    CATALYST_TEMP_B2S1 => ("013D", "Catalyst Temperature: Bank 2 - Sensor 1", 3, DecodeRule::Uas(0x16)),
    CATALYST_TEMP_B1S2 => ("013E", "Catalyst Temperature: Bank 1 - Sensor 2", 3, DecodeRule::Uas(0x16)),
    CATALYST_TEMP_B2S2 => ("013F", "Catalyst Temperature: Bank 2 - Sensor 2", 3, DecodeRule::Uas(0x16)),
    PIDS_C => ("0140", "Supported PIDs [41-60]", 5, DecodeRule::Pid),
    STATUS_DRIVE_CYCLE => ("0141", "Monitor status this drive cycle", 5, DecodeRule::Status),
    CONTROL_MODULE_VOLTAGE => ("0142", "Control module voltage", 3, DecodeRule::Uas(0x0B)),
    ABSOLUTE_LOAD => ("0143", "Absolute load value", 3, DecodeRule::AbsoluteLoad),
    COMMANDED_EQUIV_RATIO => ("0144", "Commanded equivalence ratio", 3, DecodeRule::Uas(0x1E)),
    RELATIVE_THROTTLE_POS => ("0145", "Relative throttle position", 2, DecodeRule::Percent),
    AMBIENT_AIR_TEMP => ("0146", "Ambient air temperature", 2, DecodeRule::Temp),
    THROTTLE_POS_B => ("0147", "Absolute throttle position B", 2, DecodeRule::Percent),
    THROTTLE_POS_C => ("0148", "Absolute throttle position C", 2, DecodeRule::Percent),
    ACCELERATOR_POS_D => ("0149", "Accelerator pedal position D", 2, DecodeRule::Percent),
    ACCELERATOR_POS_E => ("014A", "Accelerator pedal position E", 2, DecodeRule::Percent),
    ACCELERATOR_POS_F => ("014B", "Accelerator pedal position F", 2, DecodeRule::Percent),
    THROTTLE_ACTUATOR => ("014C", "Commanded throttle actuator", 2, DecodeRule::Percent),
    RUN_TIME_MIL => ("014D", "Time run with MIL on", 3, DecodeRule::Uas(0x34)),
    TIME_SINCE_DTC_CLEARED => ("014E", "Time since trouble codes cleared", 3, DecodeRule::Uas(0x34)),
    MAX_VALUES => ("014F", "Maximum value for various values", 5, DecodeRule::None),
    MAX_MAF => ("0150", "Maximum value for air flow rate from mass air flow sensor", 5, DecodeRule::MaxMaf),
    FUEL_TYPE => ("0151", "Fuel Type", 2, DecodeRule::FuelType),
    ETHANOL_PERCENT => ("0152", "Ethanol fuel %", 2, DecodeRule::Percent),
    EVAP_VAPOR_PRESSURE_ABS => ("0153", "Absolute Evap system vapor pressure", 3, DecodeRule::EvapPressureAlt),
    EVAP_VAPOR_PRESSURE_ALT => ("0154", "Evap system vapor pressure", 3, DecodeRule::EvapPressureAlt),
    SHORT_O2_TRIM_B1 => ("0155", "Short term secondary O2 trim - Bank 1", 3, DecodeRule::PercentCentered),
    LONG_O2_TRIM_B1 => ("0156", "Long term secondary O2 trim - Bank 1", 3, DecodeRule::PercentCentered),
    SHORT_O2_TRIM_B2 => ("0157", "Short term secondary O2 trim - Bank 2", 3, DecodeRule::PercentCentered),
    LONG_O2_TRIM_B2 => ("0158", "Long term secondary O2 trim - Bank 2", 3, DecodeRule::PercentCentered),
    FUEL_RAIL_PRESSURE_ABS => ("0159", "Fuel rail pressure (absolute)", 3, DecodeRule::Uas(0x1B)),
    RELATIVE_ACCEL_POS => ("015A", "Relative accelerator pedal position", 2, DecodeRule::Percent),
    HYBRID_BATTERY_REMAINING => ("015B", "Hybrid battery pack remaining life", 2, DecodeRule::Percent),
    OIL_TEMP => ("015C", "Engine oil temperature", 2, DecodeRule::Temp),
    FUEL_INJECT_TIMING => ("015D", "Fuel injection timing", 3, DecodeRule::InjectTiming),
    FUEL_RATE => ("015E", "Engine fuel rate", 3, DecodeRule::FuelRate),
    EMISSION_REQ => ("015F", "Designed emission requirements", 2, DecodeRule::None),
});

commands!(DTC {
    GET_DTC => ("03", "Get DTCs", 0, DecodeRule::Dtc(DtcStatus::Confirmed)),
    CLEAR_DTC => ("04", "Clear DTCs and freeze data", 0, DecodeRule::None),
    GET_PENDING_DTC => ("07", "Get Pending DTCs", 0, DecodeRule::Dtc(DtcStatus::Pending)),
    GET_PERMANENT_DTC => ("0A", "Get Permanent DTCs", 0, DecodeRule::Dtc(DtcStatus::Permanent)),
});

commands!(MODE5 {
    RTL_THRESHOLD_VOLTAGE => ("0501", "Rich to Lean Sensor Threshold Voltage", 0, DecodeRule::Monitor),
    LTR_THRESHOLD_VOLTAGE => ("0502", "Lean to Rich Sensor Threshold Voltage", 0, DecodeRule::Monitor),
    LOW_VOLTAGE_SWITCH_TIME => ("0503", "Low Sensor Voltage for Switch Time Calculation", 0, DecodeRule::Monitor),
    HIGH_VOLTAGE_SWITCH_TIME => ("0504", "High Sensor Voltage for Switch Time Calculation", 0, DecodeRule::Monitor),
    RTL_SWITCH_TIME => ("0505", "Rich to Lean Sensor Switch Time", 0, DecodeRule::Monitor),
    LTR_SWITCH_TIME => ("0506", "Lean to Rich Sensor Switch Time", 0, DecodeRule::Monitor),
    MIN_VOLTAGE => ("0507", "Minimum Sensor Voltage for Test Cycle", 0, DecodeRule::Monitor),
    MAX_VOLTAGE => ("0508", "Maximum Sensor Voltage for Test Cycle", 0, DecodeRule::Monitor),
    TRANSITION_TIME => ("0509", "Time between Sensor Transitions", 0, DecodeRule::Monitor),
});

commands!(MODE6 {
    MIDS_A => ("0600", "Supported MIDs [01-20]", 5, DecodeRule::Pid),
    MONITOR_O2_B1S1 => ("0601", "O2 Sensor Monitor Bank 1 - Sensor 1", 0, DecodeRule::Monitor),
    MONITOR_O2_B1S2 => ("0602", "O2 Sensor Monitor Bank 1 - Sensor 2", 0, DecodeRule::Monitor),
    MONITOR_O2_B1S3 => ("0603", "O2 Sensor Monitor Bank 1 - Sensor 3", 0, DecodeRule::Monitor),
    MONITOR_O2_B1S4 => ("0604", "O2 Sensor Monitor Bank 1 - Sensor 4", 0, DecodeRule::Monitor),
    MONITOR_O2_B2S1 => ("0605", "O2 Sensor Monitor Bank 2 - Sensor 1", 0, DecodeRule::Monitor),
    MONITOR_O2_B2S2 => ("0606", "O2 Sensor Monitor Bank 2 - Sensor 2", 0, DecodeRule::Monitor),
    MONITOR_O2_B2S3 => ("0607", "O2 Sensor Monitor Bank 2 - Sensor 3", 0, DecodeRule::Monitor),
    MONITOR_O2_B2S4 => ("0608", "O2 Sensor Monitor Bank 2 - Sensor 4", 0, DecodeRule::Monitor),
    MONITOR_O2_B3S1 => ("0609", "O2 Sensor Monitor Bank 3 - Sensor 1", 0, DecodeRule::Monitor),
    MONITOR_O2_B3S2 => ("060A", "O2 Sensor Monitor Bank 3 - Sensor 2", 0, DecodeRule::Monitor),
    MONITOR_O2_B3S3 => ("060B", "O2 Sensor Monitor Bank 3 - Sensor 3", 0, DecodeRule::Monitor),
    MONITOR_O2_B3S4 => ("060C", "O2 Sensor Monitor Bank 3 - Sensor 4", 0, DecodeRule::Monitor),
    MONITOR_O2_B4S1 => ("060D", "O2 Sensor Monitor Bank 4 - Sensor 1", 0, DecodeRule::Monitor),
    MONITOR_O2_B4S2 => ("060E", "O2 Sensor Monitor Bank 4 - Sensor 2", 0, DecodeRule::Monitor),
    MONITOR_O2_B4S3 => ("060F", "O2 Sensor Monitor Bank 4 - Sensor 3", 0, DecodeRule::Monitor),
    MONITOR_O2_B4S4 => ("0610", "O2 Sensor Monitor Bank 4 - Sensor 4", 0, DecodeRule::Monitor),
    MIDS_B => ("0620", "Supported MIDs [21-40]", 5, DecodeRule::Pid),
    MONITOR_CATALYST_B1 => ("0621", "Catalyst Monitor Bank 1", 0, DecodeRule::Monitor),
    MONITOR_CATALYST_B2 => ("0622", "Catalyst Monitor Bank 2", 0, DecodeRule::Monitor),
    MONITOR_CATALYST_B3 => ("0623", "Catalyst Monitor Bank 3", 0, DecodeRule::Monitor),
    MONITOR_CATALYST_B4 => ("0624", "Catalyst Monitor Bank 4", 0, DecodeRule::Monitor),
    MONITOR_EGR_B1 => ("0631", "EGR Monitor Bank 1", 0, DecodeRule::Monitor),
    MONITOR_EGR_B2 => ("0632", "EGR Monitor Bank 2", 0, DecodeRule::Monitor),
    MONITOR_EGR_B3 => ("0633", "EGR Monitor Bank 3", 0, DecodeRule::Monitor),
    MONITOR_EGR_B4 => ("0634", "EGR Monitor Bank 4", 0, DecodeRule::Monitor),
    MONITOR_VVT_B1 => ("0635", "VVT Monitor Bank 1", 0, DecodeRule::Monitor),
    MONITOR_VVT_B2 => ("0636", "VVT Monitor Bank 2", 0, DecodeRule::Monitor),
    MONITOR_VVT_B3 => ("0637", "VVT Monitor Bank 3", 0, DecodeRule::Monitor),
    MONITOR_VVT_B4 => ("0638", "VVT Monitor Bank 4", 0, DecodeRule::Monitor),
    MONITOR_EVAP_150 => ("0639", "EVAP Monitor (Cap Off / 0.150\")", 0, DecodeRule::Monitor),
    MONITOR_EVAP_090 => ("063A", "EVAP Monitor (0.090\")", 0, DecodeRule::Monitor),
    MONITOR_EVAP_040 => ("063B", "EVAP Monitor (0.040\")", 0, DecodeRule::Monitor),
    MONITOR_EVAP_020 => ("063C", "EVAP Monitor (0.020\")", 0, DecodeRule::Monitor),
    MONITOR_PURGE_FLOW => ("063D", "Purge Flow Monitor", 0, DecodeRule::Monitor),
    MIDS_C => ("0640", "Supported MIDs [41-60]", 5, DecodeRule::Pid),
    MONITOR_O2_HEATER_B1S1 => ("0641", "O2 Sensor Heater Monitor Bank 1 - Sensor 1", 0, DecodeRule::Monitor),
    MONITOR_O2_HEATER_B1S2 => ("0642", "O2 Sensor Heater Monitor Bank 1 - Sensor 2", 0, DecodeRule::Monitor),
    MONITOR_O2_HEATER_B1S3 => ("0643", "O2 Sensor Heater Monitor Bank 1 - Sensor 3", 0, DecodeRule::Monitor),
    MONITOR_O2_HEATER_B1S4 => ("0644", "O2 Sensor Heater Monitor Bank 1 - Sensor 4", 0, DecodeRule::Monitor),
    MONITOR_O2_HEATER_B2S1 => ("0645", "O2 Sensor Heater Monitor Bank 2 - Sensor 1", 0, DecodeRule::Monitor),
    MONITOR_O2_HEATER_B2S2 => ("0646", "O2 Sensor Heater Monitor Bank 2 - Sensor 2", 0, DecodeRule::Monitor),
    MONITOR_O2_HEATER_B2S3 => ("0647", "O2 Sensor Heater Monitor Bank 2 - Sensor 3", 0, DecodeRule::Monitor),
    MONITOR_O2_HEATER_B2S4 => ("0648", "O2 Sensor Heater Monitor Bank 2 - Sensor 4", 0, DecodeRule::Monitor),
    MONITOR_O2_HEATER_B3S1 => ("0649", "O2 Sensor Heater Monitor Bank 3 - Sensor 1", 0, DecodeRule::Monitor),
    MONITOR_O2_HEATER_B3S2 => ("064A", "O2 Sensor Heater Monitor Bank 3 - Sensor 2", 0, DecodeRule::Monitor),
    MONITOR_O2_HEATER_B3S3 => ("064B", "O2 Sensor Heater Monitor Bank 3 - Sensor 3", 0, DecodeRule::Monitor),
    MONITOR_O2_HEATER_B3S4 => ("064C", "O2 Sensor Heater Monitor Bank 3 - Sensor 4", 0, DecodeRule::Monitor),
    MONITOR_O2_HEATER_B4S1 => ("064D", "O2 Sensor Heater Monitor Bank 4 - Sensor 1", 0, DecodeRule::Monitor),
    MONITOR_O2_HEATER_B4S2 => ("064E", "O2 Sensor Heater Monitor Bank 4 - Sensor 2", 0, DecodeRule::Monitor),
    MONITOR_O2_HEATER_B4S3 => ("064F", "O2 Sensor Heater Monitor Bank 4 - Sensor 3", 0, DecodeRule::Monitor),
    MONITOR_O2_HEATER_B4S4 => ("0650", "O2 Sensor Heater Monitor Bank 4 - Sensor 4", 0, DecodeRule::Monitor),
    MIDS_D => ("0660", "Supported MIDs [61-80]", 5, DecodeRule::Pid),
    MONITOR_HEATED_CATALYST_B1 => ("0661", "Heated Catalyst Monitor Bank 1", 0, DecodeRule::Monitor),
    MONITOR_HEATED_CATALYST_B2 => ("0662", "Heated Catalyst Monitor Bank 2", 0, DecodeRule::Monitor),
    MONITOR_HEATED_CATALYST_B3 => ("0663", "Heated Catalyst Monitor Bank 3", 0, DecodeRule::Monitor),
    MONITOR_HEATED_CATALYST_B4 => ("0664", "Heated Catalyst Monitor Bank 4", 0, DecodeRule::Monitor),
    MONITOR_SECONDARY_AIR_1 => ("0671", "Secondary Air Monitor 1", 0, DecodeRule::Monitor),
    MONITOR_SECONDARY_AIR_2 => ("0672", "Secondary Air Monitor 2", 0, DecodeRule::Monitor),
    MONITOR_SECONDARY_AIR_3 => ("0673", "Secondary Air Monitor 3", 0, DecodeRule::Monitor),
    MONITOR_SECONDARY_AIR_4 => ("0674", "Secondary Air Monitor 4", 0, DecodeRule::Monitor),
    MIDS_E => ("0680", "Supported MIDs [81-A0]", 5, DecodeRule::Pid),
    MONITOR_FUEL_SYSTEM_B1 => ("0681", "Fuel System Monitor Bank 1", 0, DecodeRule::Monitor),
    MONITOR_FUEL_SYSTEM_B2 => ("0682", "Fuel System Monitor Bank 2", 0, DecodeRule::Monitor),
    MONITOR_FUEL_SYSTEM_B3 => ("0683", "Fuel System Monitor Bank 3", 0, DecodeRule::Monitor),
    MONITOR_FUEL_SYSTEM_B4 => ("0684", "Fuel System Monitor Bank 4", 0, DecodeRule::Monitor),
    MONITOR_BOOST_PRESSURE_B1 => ("0685", "Boost Pressure Control Monitor Bank 1", 0, DecodeRule::Monitor),
    MONITOR_BOOST_PRESSURE_B2 => ("0686", "Boost Pressure Control Monitor Bank 2", 0, DecodeRule::Monitor),
    MONITOR_NOX_ABSORBER_B1 => ("0690", "NOx Absorber Monitor Bank 1", 0, DecodeRule::Monitor),
    MONITOR_NOX_ABSORBER_B2 => ("0691", "NOx Absorber Monitor Bank 2", 0, DecodeRule::Monitor),
    MONITOR_NOX_CATALYST_B1 => ("0698", "NOx Catalyst Monitor Bank 1", 0, DecodeRule::Monitor),
    MONITOR_NOX_CATALYST_B2 => ("0699", "NOx Catalyst Monitor Bank 2", 0, DecodeRule::Monitor),
    MIDS_F => ("06A0", "Supported MIDs [A1-C0]", 5, DecodeRule::Pid),
    MONITOR_MISFIRE_GENERAL => ("06A1", "Misfire Monitor General Data", 0, DecodeRule::Monitor),
    MONITOR_MISFIRE_CYLINDER_1 => ("06A2", "Misfire Cylinder 1 Data", 0, DecodeRule::Monitor),
    MONITOR_MISFIRE_CYLINDER_2 => ("06A3", "Misfire Cylinder 2 Data", 0, DecodeRule::Monitor),
    MONITOR_MISFIRE_CYLINDER_3 => ("06A4", "Misfire Cylinder 3 Data", 0, DecodeRule::Monitor),
    MONITOR_MISFIRE_CYLINDER_4 => ("06A5", "Misfire Cylinder 4 Data", 0, DecodeRule::Monitor),
    MONITOR_MISFIRE_CYLINDER_5 => ("06A6", "Misfire Cylinder 5 Data", 0, DecodeRule::Monitor),
    MONITOR_MISFIRE_CYLINDER_6 => ("06A7", "Misfire Cylinder 6 Data", 0, DecodeRule::Monitor),
    MONITOR_MISFIRE_CYLINDER_7 => ("06A8", "Misfire Cylinder 7 Data", 0, DecodeRule::Monitor),
    MONITOR_MISFIRE_CYLINDER_8 => ("06A9", "Misfire Cylinder 8 Data", 0, DecodeRule::Monitor),
    MONITOR_MISFIRE_CYLINDER_9 => ("06AA", "Misfire Cylinder 9 Data", 0, DecodeRule::Monitor),
    MONITOR_MISFIRE_CYLINDER_10 => ("06AB", "Misfire Cylinder 10 Data", 0, DecodeRule::Monitor),
    MONITOR_MISFIRE_CYLINDER_11 => ("06AC", "Misfire Cylinder 11 Data", 0, DecodeRule::Monitor),
    MONITOR_MISFIRE_CYLINDER_12 => ("06AD", "Misfire Cylinder 12 Data", 0, DecodeRule::Monitor),
    MONITOR_PM_FILTER_B1 => ("06B0", "PM Filter Monitor Bank 1", 0, DecodeRule::Monitor),
    MONITOR_PM_FILTER_B2 => ("06B1", "PM Filter Monitor Bank 2", 0, DecodeRule::Monitor),
});

commands!(MODE8 {
    EVAP_LEAK_TEST => ("0801", "EVAP System Leak Test", 0, DecodeRule::Raw),
});

commands!(MODE9 {
    PIDS_9A => ("0900", "Supported PIDs [01-20]", 5, DecodeRule::Pid),
    VIN_MESSAGE_COUNT => ("0901", "VIN Message Count", 2, DecodeRule::Count),
    VIN => ("0902", "Vehicle Identification Number", 0, DecodeRule::EncodedString),
    CALIBRATION_ID_MESSAGE_COUNT => ("0903", "Calibration ID message count", 2, DecodeRule::Count),
    CALIBRATION_ID => ("0904", "Calibration ID", 0, DecodeRule::EncodedString),
    CVN_MESSAGE_COUNT => ("0905", "CVN Message Count", 2, DecodeRule::Count),
    CVN => ("0906", "Calibration Verification Numbers", 0, DecodeRule::Cvn),
});

/// Mode 02 descriptors, derived from mode 01
pub static MODE2: Lazy<Vec<Command>> =
    Lazy::new(|| MODE1.iter().filter_map(Command::freeze_frame).collect());

static ALL: Lazy<Vec<Command>> = Lazy::new(|| {
    GENERAL
        .iter()
        .chain(MODE1)
        .chain(MODE2.iter())
        .chain(DTC)
        .chain(MODE5)
        .chain(MODE6)
        .chain(MODE8)
        .chain(MODE9)
        .cloned()
        .collect()
});

static BY_TEXT: Lazy<HashMap<&'static str, &'static Command>> =
    Lazy::new(|| ALL.iter().map(|c| (c.text.as_ref(), c)).collect());

/// Every catalog descriptor
pub fn all() -> &'static [Command] {
    &ALL
}

/// Look up a descriptor by command text, case-insensitive
pub fn by_text(text: &str) -> Option<&'static Command> {
    BY_TEXT.get(text.trim().to_ascii_uppercase().as_str()).copied()
}

/// Mode 01 descriptor for a PID number
pub fn mode1(pid: u8) -> Option<&'static Command> {
    MODE1.iter().find(|c| c.pid() == Some(pid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_mode1_covers_00_to_5f() {
        assert_eq!(MODE1.len(), 0x60);
        for (i, cmd) in MODE1.iter().enumerate() {
            assert_eq!(cmd.pid(), Some(i as u8), "{}", cmd.text);
        }
    }

    #[test]
    fn test_widths_include_echo() {
        assert_eq!(RPM.bytes, 3);
        assert_eq!(SPEED.bytes, 2);
        assert_eq!(PIDS_A.bytes, 5);
        assert_eq!(STATUS.bytes, 5);
        assert_eq!(VIN.bytes, 0);
    }

    #[test]
    fn test_lookup() {
        assert_eq!(by_text("010c"), Some(&RPM));
        assert_eq!(by_text("020C").map(|c| c.rule), Some(RPM.rule));
        assert_eq!(by_text("0902"), Some(&VIN));
        assert!(by_text("01FF").is_none());
        assert_eq!(mode1(0x0D), Some(&SPEED));
    }

    #[test]
    fn test_texts_are_unique() {
        let texts: HashSet<_> = all().iter().map(|c| c.text.as_ref()).collect();
        assert_eq!(texts.len(), all().len());
        assert_eq!(MODE2.len(), MODE1.len());
    }
}
