pub mod backend;

// global logger macro
extern crate log as glog;
