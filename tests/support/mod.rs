#![allow(dead_code)]

pub mod vibesense_env;
