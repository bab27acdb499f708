mod layer;
mod model_state;
mod node_batch_norm2d;
mod node_dropout;
mod node_normalize;
