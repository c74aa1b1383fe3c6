#![no_std]

pub mod apic;
pub mod pic;
