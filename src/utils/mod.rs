pub mod sse_buffer;
