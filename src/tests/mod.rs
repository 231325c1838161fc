// Tests module
// Activation scenarios: full runs of the state machine against synthetic chains
