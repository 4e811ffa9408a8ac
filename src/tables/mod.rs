pub mod assignment_groups;
