mod applications;
mod catalog;
mod common;
