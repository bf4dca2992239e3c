pub mod smaa_renderer;
