mod des_net;
