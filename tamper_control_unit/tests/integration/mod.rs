mod config_startup;
mod gcode_cycle;
mod stall_dispatch;
mod tamping_cycle;
