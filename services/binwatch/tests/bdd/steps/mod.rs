mod dashboard_steps;
mod stats_steps;
mod transition_steps;
