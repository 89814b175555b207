mod lattice_laws;
